//! Scan orchestration.
//!
//! Resolves the target universe, then walks it proxy by proxy: proxy
//! scanners run once against the proxy definition, revision scanners run
//! over every selected revision. Everything is sequential and ordered;
//! revision findings are emitted scanner-major (all revisions for the first
//! scanner, then the next scanner).

pub mod reduce;

use tracing::{debug, info};

use crate::api::ManagementApi;
use crate::bundle::BundleWorkspace;
use crate::error::Result;
use crate::model::{RevisionContext, Target};
use crate::scanners::{DataSource, Finding, ProxyScanner, RevisionScanner, Scanner};
use crate::ScanOptions;

pub use reduce::{fold_findings, fold_in_order};

/// How revision scanners get their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    /// Revision scanners query the management API themselves.
    Api,
    /// Each revision is exported and unpacked before scanning.
    Bundle,
}

impl DataMode {
    /// Bundle mode as soon as one active revision scanner reads bundle files.
    pub fn for_scanners(scanners: &[Box<dyn RevisionScanner>]) -> Self {
        if scanners
            .iter()
            .any(|s| s.data_source() == DataSource::Bundle)
        {
            Self::Bundle
        } else {
            Self::Api
        }
    }
}

pub struct Orchestrator<'a> {
    api: &'a dyn ManagementApi,
    proxy_scanners: Vec<Box<dyn ProxyScanner>>,
    revision_scanners: Vec<Box<dyn RevisionScanner>>,
    mode: DataMode,
    options: &'a ScanOptions,
}

impl<'a> Orchestrator<'a> {
    /// Partition realized scanners by kind, keeping their relative order.
    pub fn new(api: &'a dyn ManagementApi, scanners: Vec<Scanner>, options: &'a ScanOptions) -> Self {
        let mut proxy_scanners = Vec::new();
        let mut revision_scanners = Vec::new();
        for scanner in scanners {
            match scanner {
                Scanner::Proxy(s) => proxy_scanners.push(s),
                Scanner::Revision(s) => revision_scanners.push(s),
            }
        }
        let mode = DataMode::for_scanners(&revision_scanners);

        Self {
            api,
            proxy_scanners,
            revision_scanners,
            mode,
            options,
        }
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    /// Run every scanner over the target universe.
    pub async fn run(&self) -> Result<Vec<Finding>> {
        let universe = self.resolve_universe().await?;
        info!(
            targets = universe.len(),
            proxy_scanners = self.proxy_scanners.len(),
            revision_scanners = self.revision_scanners.len(),
            mode = ?self.mode,
            "starting scan"
        );

        // dropped on every early return, which removes the directory
        let workspace = match self.mode {
            DataMode::Bundle => Some(BundleWorkspace::create(self.options.work_dir.as_deref())?),
            DataMode::Api => None,
        };

        let per_target = fold_in_order(universe, |target| {
            self.scan_target(target, workspace.as_ref())
        })
        .await?;

        if let Some(workspace) = workspace {
            workspace.close()?;
        }

        let findings: Vec<Finding> = per_target.into_iter().flatten().collect();
        info!(findings = findings.len(), "scan complete");
        Ok(findings)
    }

    /// The proxies (and, when deployed, revisions) selected for this run,
    /// sorted by proxy name.
    pub async fn resolve_universe(&self) -> Result<Vec<Target>> {
        let mut targets = if self.options.deployed {
            let refs = self
                .api
                .get_deployments(self.options.environment.as_deref())
                .await?
                .into_refs()?;
            Target::group_deployments(refs)
        } else {
            self.api
                .list_proxies()
                .await?
                .into_iter()
                .map(|p| Target::all_revisions(p.name))
                .collect()
        };

        if let Some(pattern) = &self.options.name_pattern {
            targets.retain(|t| pattern.is_match(&t.name));
        }
        targets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(targets)
    }

    async fn scan_target(
        &self,
        target: Target,
        workspace: Option<&BundleWorkspace>,
    ) -> Result<Vec<Finding>> {
        let definition = self.api.get_proxy(&target.name).await?;

        let mut findings =
            fold_findings(&self.proxy_scanners, |scanner| scanner.scan(&definition)).await?;

        let revisions = target.revisions(&definition, self.options.latest_revision)?;
        debug!(proxy = %target.name, ?revisions, "examining proxy");
        if self.revision_scanners.is_empty() || revisions.is_empty() {
            return Ok(findings);
        }

        let contexts = match workspace {
            Some(workspace) => {
                fold_in_order(revisions, |revision| {
                    workspace.materialize(self.api, &target.name, revision)
                })
                .await?
            }
            None => revisions
                .into_iter()
                .map(|revision| RevisionContext::new(target.name.clone(), revision))
                .collect(),
        };

        let matrix = fold_in_order(&self.revision_scanners, |scanner| {
            fold_findings(&contexts, move |ctx| scanner.scan(ctx))
        })
        .await?;
        findings.extend(matrix.into_iter().flatten());

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockApi, StubProxyScanner, StubRevisionScanner};
    use pretty_assertions::assert_eq;
    use regex::Regex;

    fn names(targets: &[Target]) -> Vec<&str> {
        targets.iter().map(|t| t.name.as_str()).collect()
    }

    #[tokio::test]
    async fn name_pattern_filters_universe() {
        let api = MockApi::new()
            .proxy("foo-a", &["1"])
            .proxy("bar-b", &["1"])
            .proxy("foo-c", &["1"]);
        let options = ScanOptions {
            name_pattern: Some(Regex::new("^foo-").unwrap()),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(&api, vec![], &options);
        let universe = orchestrator.resolve_universe().await.unwrap();
        assert_eq!(names(&universe), vec!["foo-a", "foo-c"]);
    }

    #[tokio::test]
    async fn universe_order_does_not_depend_on_api_order() {
        let forward = MockApi::new().proxy("a", &["1"]).proxy("b", &["1"]);
        let backward = MockApi::new().proxy("b", &["1"]).proxy("a", &["1"]);
        let options = ScanOptions::default();
        let one = Orchestrator::new(&forward, vec![], &options).resolve_universe().await.unwrap();
        let two = Orchestrator::new(&backward, vec![], &options).resolve_universe().await.unwrap();
        assert_eq!(one, two);
    }

    #[tokio::test]
    async fn deployed_universe_pins_revisions() {
        let api = MockApi::new().proxy("demo", &["1", "2", "3"]).deployments(serde_json::json!({
            "deployments": [
                {"environment": "test", "apiProxy": "demo", "revision": "2"},
                {"environment": "prod", "apiProxy": "demo", "revision": "3"}
            ]
        }));
        let stub = StubRevisionScanner::flag_all("deployed");
        let calls = stub.calls();
        let options = ScanOptions {
            deployed: true,
            environment: None,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(&api, vec![Scanner::Revision(Box::new(stub))], &options);
        let findings = orchestrator.run().await.unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(*calls.lock().unwrap(), vec![("demo".to_string(), 2), ("demo".to_string(), 3)]);
    }

    #[tokio::test]
    async fn invocations_are_scanners_times_revisions() {
        let api = MockApi::new().proxy("demo", &["3", "1", "2"]);
        let first = StubRevisionScanner::flag_none("first");
        let second = StubRevisionScanner::flag_none("second");
        let (c1, c2) = (first.calls(), second.calls());
        let options = ScanOptions::default();
        let orchestrator = Orchestrator::new(
            &api,
            vec![Scanner::Revision(Box::new(first)), Scanner::Revision(Box::new(second))],
            &options,
        );
        let findings = orchestrator.run().await.unwrap();
        assert!(findings.is_empty());
        let revs = |c: &std::sync::Arc<std::sync::Mutex<Vec<(String, u32)>>>| {
            c.lock().unwrap().iter().map(|(_, r)| *r).collect::<Vec<_>>()
        };
        assert_eq!(revs(&c1), vec![1, 2, 3]);
        assert_eq!(revs(&c2), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn findings_are_scanner_major() {
        let api = MockApi::new().proxy("demo", &["1", "2"]);
        let options = ScanOptions::default();
        let orchestrator = Orchestrator::new(
            &api,
            vec![
                Scanner::Proxy(Box::new(StubProxyScanner::flag_all("proxy"))),
                Scanner::Revision(Box::new(StubRevisionScanner::flag_all("a"))),
                Scanner::Revision(Box::new(StubRevisionScanner::flag_all("b"))),
            ],
            &options,
        );
        let findings = orchestrator.run().await.unwrap();
        let labels: Vec<(String, Option<u32>)> =
            findings.iter().map(|f| (f.scan.clone(), f.revision)).collect();
        assert_eq!(
            labels,
            vec![
                ("proxy".to_string(), None),
                ("a".to_string(), Some(1)),
                ("a".to_string(), Some(2)),
                ("b".to_string(), Some(1)),
                ("b".to_string(), Some(2)),
            ]
        );
    }

    #[tokio::test]
    async fn latest_revision_scans_only_highest() {
        let api = MockApi::new().proxy("demo", &["1", "2", "5"]);
        let stub = StubRevisionScanner::flag_all("latest");
        let calls = stub.calls();
        let options = ScanOptions {
            latest_revision: true,
            ..Default::default()
        };
        Orchestrator::new(&api, vec![Scanner::Revision(Box::new(stub))], &options)
            .run()
            .await
            .unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![("demo".to_string(), 5)]);
    }

    #[tokio::test]
    async fn api_mode_never_exports() {
        let api = MockApi::new().proxy("demo", &["1"]);
        let options = ScanOptions::default();
        let orchestrator = Orchestrator::new(
            &api,
            vec![Scanner::Revision(Box::new(StubRevisionScanner::flag_all("x")))],
            &options,
        );
        assert_eq!(orchestrator.mode(), DataMode::Api);
        orchestrator.run().await.unwrap();
        assert!(api.calls().iter().all(|c| !c.starts_with("export")));
    }

    #[tokio::test]
    async fn bundle_mode_materializes_each_revision() {
        let files: &[(&str, &str)] = &[("apiproxy/demo.xml", "<APIProxy name=\"demo\"/>")];
        let api = MockApi::new()
            .proxy("demo", &["1", "2"])
            .bundle("demo", 1, files)
            .bundle("demo", 2, files);
        let stub = StubRevisionScanner::flag_all("bundle").reading_bundles();
        let seen_dirs = stub.bundle_dirs();
        let work = tempfile::tempdir().unwrap();
        let options = ScanOptions {
            work_dir: Some(work.path().to_path_buf()),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(&api, vec![Scanner::Revision(Box::new(stub))], &options);
        assert_eq!(orchestrator.mode(), DataMode::Bundle);
        orchestrator.run().await.unwrap();

        let dirs = seen_dirs.lock().unwrap().clone();
        assert_eq!(dirs.len(), 2);
        assert!(dirs[0].ends_with("proxy-demo-r1"));
        assert!(dirs[1].ends_with("proxy-demo-r2"));
        assert!(dirs.iter().all(|d| d.starts_with(work.path())));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn scanner_failure_aborts_and_cleans_up() {
        let files: &[(&str, &str)] = &[("apiproxy/demo.xml", "<APIProxy/>")];
        let api = MockApi::new()
            .proxy("demo", &["1", "2"])
            .bundle("demo", 1, files)
            .bundle("demo", 2, files);
        let work = tempfile::tempdir().unwrap();
        let options = ScanOptions {
            work_dir: Some(work.path().to_path_buf()),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(
            &api,
            vec![Scanner::Revision(Box::new(
                StubRevisionScanner::failing_on(2).reading_bundles(),
            ))],
            &options,
        );
        assert!(orchestrator.run().await.is_err());
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unflagged_revisions_leave_no_entries() {
        let api = MockApi::new().proxy("demo", &["1", "2"]);
        let options = ScanOptions::default();
        let findings = Orchestrator::new(
            &api,
            vec![Scanner::Revision(Box::new(StubRevisionScanner::flag_revision("check", 2)))],
            &options,
        )
        .run()
        .await
        .unwrap();
        assert_eq!(findings, vec![Finding::revision("demo", 2, "check")]);
    }

    #[tokio::test]
    async fn api_failure_aborts_run() {
        let api = MockApi::new()
            .proxy("a", &["1"])
            .proxy("b", &["1"])
            .failing("get_proxy b");
        let stub = StubRevisionScanner::flag_all("x");
        let options = ScanOptions::default();
        let result = Orchestrator::new(&api, vec![Scanner::Revision(Box::new(stub))], &options)
            .run()
            .await;
        assert!(result.is_err());
    }
}
