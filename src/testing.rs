//! Test doubles: an in-memory management API, stub scanners and in-memory
//! bundle archives.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::{ExportedBundle, ManagementApi};
use crate::error::{Result, ScanError};
use crate::model::{
    DeploymentsResponse, EndpointInfo, ProxyDefinition, ProxyRef, RevisionContext,
    RevisionDefinition, RevisionId,
};
use crate::scanners::{DataSource, Finding, ProxyScanner, RevisionScanner};

/// Zip archive with the given `(path, content)` entries.
pub fn bundle_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (path, content) in files {
        writer.start_file(*path, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

type Key = (String, u32);

#[derive(Default)]
pub struct MockApi {
    proxies: Vec<ProxyDefinition>,
    descriptions: HashMap<Key, String>,
    bundles: HashMap<Key, Vec<u8>>,
    targets: HashMap<Key, Vec<(String, EndpointInfo)>>,
    endpoints: HashMap<Key, Vec<(String, EndpointInfo)>>,
    deployments: Option<serde_json::Value>,
    failing: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxy(mut self, name: &str, revisions: &[&str]) -> Self {
        self.proxies.push(ProxyDefinition {
            name: name.into(),
            revision: revisions.iter().map(|r| RevisionId::from(*r)).collect(),
            description: None,
        });
        self
    }

    pub fn description(mut self, name: &str, revision: u32, text: &str) -> Self {
        self.descriptions
            .insert((name.into(), revision), text.into());
        self
    }

    pub fn bundle(mut self, name: &str, revision: u32, files: &[(&str, &str)]) -> Self {
        self.bundles
            .insert((name.into(), revision), bundle_zip(files));
        self
    }

    pub fn target(mut self, name: &str, revision: u32, target: &str, info: serde_json::Value) -> Self {
        let info: EndpointInfo = serde_json::from_value(info).unwrap();
        self.targets
            .entry((name.into(), revision))
            .or_default()
            .push((target.into(), info));
        self
    }

    pub fn proxy_endpoint(
        mut self,
        name: &str,
        revision: u32,
        endpoint: &str,
        info: serde_json::Value,
    ) -> Self {
        let info: EndpointInfo = serde_json::from_value(info).unwrap();
        self.endpoints
            .entry((name.into(), revision))
            .or_default()
            .push((endpoint.into(), info));
        self
    }

    pub fn deployments(mut self, response: serde_json::Value) -> Self {
        self.deployments = Some(response);
        self
    }

    /// Fail any call whose log line starts with `call`.
    pub fn failing(mut self, call: &str) -> Self {
        self.failing = Some(call.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        let fail = self
            .failing
            .as_deref()
            .is_some_and(|prefix| call.starts_with(prefix));
        self.calls.lock().unwrap().push(call.clone());
        if fail {
            return Err(ScanError::Api {
                url: call,
                status: 500,
                message: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn not_found(what: String) -> ScanError {
        ScanError::Api {
            url: what,
            status: 404,
            message: "not found".into(),
        }
    }

    fn lookup<'a>(
        map: &'a HashMap<Key, Vec<(String, EndpointInfo)>>,
        name: &str,
        revision: u32,
    ) -> &'a [(String, EndpointInfo)] {
        map.get(&(name.to_string(), revision))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[async_trait]
impl ManagementApi for MockApi {
    async fn list_proxies(&self) -> Result<Vec<ProxyRef>> {
        self.record("list_proxies".into())?;
        Ok(self
            .proxies
            .iter()
            .map(|p| ProxyRef {
                name: p.name.clone(),
            })
            .collect())
    }

    async fn get_proxy(&self, name: &str) -> Result<ProxyDefinition> {
        self.record(format!("get_proxy {name}"))?;
        self.proxies
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| Self::not_found(name.into()))
    }

    async fn get_revision(&self, name: &str, revision: u32) -> Result<RevisionDefinition> {
        self.record(format!("get_revision {name} {revision}"))?;
        Ok(RevisionDefinition {
            name: name.into(),
            revision: revision.into(),
            description: self.descriptions.get(&(name.to_string(), revision)).cloned(),
        })
    }

    async fn get_deployments(&self, environment: Option<&str>) -> Result<DeploymentsResponse> {
        self.record(format!("get_deployments {}", environment.unwrap_or("*")))?;
        let value = self
            .deployments
            .clone()
            .unwrap_or_else(|| serde_json::json!({"deployments": []}));
        Ok(serde_json::from_value(value)?)
    }

    async fn export_bundle(&self, name: &str, revision: u32) -> Result<ExportedBundle> {
        self.record(format!("export {name} {revision}"))?;
        let bytes = self
            .bundles
            .get(&(name.to_string(), revision))
            .cloned()
            .ok_or_else(|| Self::not_found(format!("{name} r{revision} bundle")))?;
        Ok(ExportedBundle {
            filename: format!("{name}-r{revision}.zip"),
            bytes,
        })
    }

    async fn list_targets(&self, name: &str, revision: u32) -> Result<Vec<String>> {
        self.record(format!("list_targets {name} {revision}"))?;
        Ok(Self::lookup(&self.targets, name, revision)
            .iter()
            .map(|(t, _)| t.clone())
            .collect())
    }

    async fn get_target(&self, name: &str, revision: u32, target: &str) -> Result<EndpointInfo> {
        self.record(format!("get_target {name} {revision} {target}"))?;
        Self::lookup(&self.targets, name, revision)
            .iter()
            .find(|(t, _)| t == target)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| Self::not_found(target.into()))
    }

    async fn list_proxy_endpoints(&self, name: &str, revision: u32) -> Result<Vec<String>> {
        self.record(format!("list_proxy_endpoints {name} {revision}"))?;
        Ok(Self::lookup(&self.endpoints, name, revision)
            .iter()
            .map(|(e, _)| e.clone())
            .collect())
    }

    async fn get_proxy_endpoint(
        &self,
        name: &str,
        revision: u32,
        endpoint: &str,
    ) -> Result<EndpointInfo> {
        self.record(format!("get_proxy_endpoint {name} {revision} {endpoint}"))?;
        Self::lookup(&self.endpoints, name, revision)
            .iter()
            .find(|(e, _)| e == endpoint)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| Self::not_found(endpoint.into()))
    }
}

/// Proxy scanner that flags every proxy.
pub struct StubProxyScanner {
    label: String,
}

impl StubProxyScanner {
    pub fn flag_all(label: &str) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl ProxyScanner for StubProxyScanner {
    async fn scan(&self, proxy: &ProxyDefinition) -> Result<Option<Finding>> {
        Ok(Some(Finding::proxy(&proxy.name, &self.label)))
    }
}

enum Behavior {
    FlagAll,
    FlagNone,
    FlagRevision(u32),
    FailOn(u32),
}

/// Revision scanner recording every invocation.
pub struct StubRevisionScanner {
    label: String,
    behavior: Behavior,
    source: DataSource,
    calls: Arc<Mutex<Vec<(String, u32)>>>,
    bundle_dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl StubRevisionScanner {
    fn with(label: &str, behavior: Behavior) -> Self {
        Self {
            label: label.into(),
            behavior,
            source: DataSource::Api,
            calls: Arc::default(),
            bundle_dirs: Arc::default(),
        }
    }

    pub fn flag_all(label: &str) -> Self {
        Self::with(label, Behavior::FlagAll)
    }

    pub fn flag_none(label: &str) -> Self {
        Self::with(label, Behavior::FlagNone)
    }

    pub fn flag_revision(label: &str, revision: u32) -> Self {
        Self::with(label, Behavior::FlagRevision(revision))
    }

    pub fn failing_on(revision: u32) -> Self {
        Self::with("failing", Behavior::FailOn(revision))
    }

    pub fn reading_bundles(mut self) -> Self {
        self.source = DataSource::Bundle;
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<(String, u32)>>> {
        Arc::clone(&self.calls)
    }

    pub fn bundle_dirs(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.bundle_dirs)
    }
}

#[async_trait]
impl RevisionScanner for StubRevisionScanner {
    fn data_source(&self) -> DataSource {
        self.source
    }

    async fn scan(&self, ctx: &RevisionContext) -> Result<Option<Finding>> {
        self.calls
            .lock()
            .unwrap()
            .push((ctx.name.clone(), ctx.revision));
        if self.source == DataSource::Bundle {
            let dir = ctx.bundle_dir()?;
            assert!(dir.is_dir(), "bundle dir {} missing", dir.display());
            self.bundle_dirs.lock().unwrap().push(dir.to_path_buf());
        }

        let flag = match self.behavior {
            Behavior::FlagAll => true,
            Behavior::FlagNone => false,
            Behavior::FlagRevision(r) => ctx.revision == r,
            Behavior::FailOn(r) if ctx.revision == r => {
                return Err(ScanError::Internal(format!("scanner failed on r{r}")))
            }
            Behavior::FailOn(_) => false,
        };
        Ok(flag.then(|| Finding::revision(&ctx.name, ctx.revision, &self.label)))
    }
}

/// Context for building a scanner against `api`.
pub fn context(api: MockApi, arg: Option<&str>) -> crate::scanners::ScannerContext {
    crate::scanners::ScannerContext {
        api: Arc::new(api),
        arg: match arg {
            Some(v) => crate::scanners::PluginArg::Value(v.into()),
            None => crate::scanners::PluginArg::Flag,
        },
        verbose: true,
    }
}

pub fn proxy_scanner(
    plugin: &dyn crate::scanners::ScannerPlugin,
    ctx: crate::scanners::ScannerContext,
) -> Box<dyn ProxyScanner> {
    match plugin.build(ctx) {
        Ok(crate::scanners::Scanner::Proxy(s)) => s,
        Ok(_) => panic!("expected a proxy scanner"),
        Err(e) => panic!("build failed: {e}"),
    }
}

pub fn revision_scanner(
    plugin: &dyn crate::scanners::ScannerPlugin,
    ctx: crate::scanners::ScannerContext,
) -> Box<dyn RevisionScanner> {
    match plugin.build(ctx) {
        Ok(crate::scanners::Scanner::Revision(s)) => s,
        Ok(_) => panic!("expected a revision scanner"),
        Err(e) => panic!("build failed: {e}"),
    }
}

/// Unpacked bundle on disk with the given `(path, content)` files.
pub fn bundle_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    dir
}

/// Revision context pointing at an unpacked bundle.
pub fn bundle_context(dir: &tempfile::TempDir, name: &str, revision: u32) -> RevisionContext {
    RevisionContext::new(name, revision).with_bundle_dir(dir.path().to_path_buf())
}

/// Formatted log lines written while capturing.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `fut` to completion on this thread and return its output with every
/// `INFO` or higher event it logged.
pub fn capture_logs<F: std::future::Future>(fut: F) -> (F::Output, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let output = tracing::subscriber::with_default(subscriber, || runtime.block_on(fut));
    (output, buffer.contents())
}

/// Same context with progress events switched off.
pub fn quiet(mut ctx: crate::scanners::ScannerContext) -> crate::scanners::ScannerContext {
    ctx.verbose = false;
    ctx
}
