//! Fetch command - resolve a quantization tag and download the file.

use std::path::PathBuf;
use std::time::Duration;

use quantpull::{
    ArtifactFetcher, ArtifactResolver, FetchError, FetchedArtifact, HubClient, HubConfig,
    MatchPolicy, RepositoryLister, RepositoryRef, ResolveStage, SearchTerm, Selection,
};
use tracing::debug;

use crate::error::CliError;
use crate::output::{Output, Status};
use crate::progress::DownloadProgress;

/// Arguments for the fetch command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchArgs {
    pub repo_id: String,
    pub quantization: String,
    pub output: PathBuf,
    pub revision: Option<String>,
    pub endpoint: Option<String>,
    pub timeout: Option<u64>,
    pub strict: bool,
    pub dry_run: bool,
    pub show_progress: bool,
}

impl FetchArgs {
    /// Apply command line overrides on top of `base`.
    pub fn hub_config(&self, base: HubConfig) -> Result<HubConfig, CliError> {
        let mut config = base;

        if let Some(ref endpoint) = self.endpoint {
            config = config.with_endpoint(endpoint.as_str());
        }
        if let Some(ref revision) = self.revision {
            config = config.with_revision(revision.as_str());
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                return Err(CliError::Config(
                    "--timeout must be at least 1 second".to_string(),
                ));
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if self.strict {
            config = config.with_match_policy(MatchPolicy::RequireUnique);
        }

        Ok(config)
    }
}

/// Run the fetch command against the hub.
pub fn run(args: &FetchArgs, out: &dyn Output) -> Result<(), CliError> {
    let repo = RepositoryRef::new(args.repo_id.as_str())?;
    let term = SearchTerm::new(args.quantization.as_str());
    let config = args.hub_config(HubConfig::from_env())?;
    debug!(config = ?config, "Resolved configuration");

    out.println(&format!("Searching repository: {}", repo));
    out.println(&format!("Looking for quantization: {}", term.as_str()));
    out.separator();

    let client = HubClient::new(config)?;
    let resolver = ArtifactResolver::new(&client, &client)
        .with_policy(client.config().match_policy)
        .with_stage_callback(Box::new(|stage: ResolveStage, message: &str| {
            debug!(stage = stage.name(), "{}", message);
        }));

    execute(&resolver, &repo, &term, args, out)
}

/// Resolve, report the selection and download.
fn execute<L, F>(
    resolver: &ArtifactResolver<L, F>,
    repo: &RepositoryRef,
    term: &SearchTerm,
    args: &FetchArgs,
    out: &dyn Output,
) -> Result<(), CliError>
where
    L: RepositoryLister,
    F: ArtifactFetcher,
{
    let selection = resolver.resolve(repo, term)?;
    print_selection(out, &selection);

    if args.dry_run {
        out.status(
            Status::Step,
            &format!(
                "Dry run: would download {} to {}/",
                selection.file(),
                args.output.display()
            ),
        );
        return Ok(());
    }

    out.status(
        Status::Step,
        &format!("Downloading to: {}/", args.output.display()),
    );

    let progress = args.show_progress.then(DownloadProgress::new);
    let result = resolver.fetch_selected(
        repo,
        &selection,
        &args.output,
        progress.as_ref().map(DownloadProgress::callback),
    );
    if let Some(ref progress) = progress {
        progress.finish();
    }

    print_artifact(out, &result?);
    Ok(())
}

/// Print which file was chosen; an ambiguous choice lists every candidate.
pub fn print_selection(out: &dyn Output, selection: &Selection) {
    match selection {
        Selection::Unique(file) => {
            out.status(Status::Success, &format!("Match found: {}", file));
        }
        Selection::Ambiguous {
            selected,
            candidates,
        } => {
            out.status(
                Status::Warning,
                &format!(
                    "Multiple files matched ({}). Downloading the first one found: {}",
                    candidates.len(),
                    selected
                ),
            );
            for candidate in candidates {
                out.indented(&format!("- {}", candidate));
            }
            out.indented("Use a longer quantization string or --strict to avoid guessing.");
        }
    }
}

/// Print the outcome of a finished download.
pub fn print_artifact(out: &dyn Output, artifact: &FetchedArtifact) {
    out.newline();
    if artifact.already_complete {
        out.status(Status::Success, "File already downloaded, nothing to do.");
    } else {
        out.status(Status::Success, "Download successful!");
        if artifact.resumed_from > 0 {
            out.indented(&format!(
                "Resumed from byte {} of {}",
                artifact.resumed_from, artifact.bytes
            ));
        }
    }
    out.indented(&format!("Saved to: {}", artifact.path.display()));
}

/// Print a failure with whatever context helps the user recover.
pub fn report_error(out: &dyn Output, err: &CliError) {
    out.newline();

    match err {
        CliError::Fetch(FetchError::NoMatch {
            term,
            preview,
            total,
        }) => {
            out.status(
                Status::Error,
                &format!("Error: No files found matching '{}'.", term),
            );
            out.newline();
            if preview.is_empty() {
                out.println("The repository contains no files.");
            } else {
                out.println(&format!(
                    "Available files in repository (showing first {} of {}):",
                    preview.len(),
                    total
                ));
                for file in preview {
                    out.println(&format!(" - {}", file));
                }
            }
        }
        CliError::Fetch(FetchError::RepositoryNotFound { repo }) => {
            out.status(
                Status::Error,
                &format!("Error: Repository '{}' not found or is private.", repo),
            );
        }
        CliError::Fetch(FetchError::AmbiguousMatch { term, candidates }) => {
            out.status(
                Status::Error,
                &format!(
                    "Error: '{}' matched {} files and --strict requires exactly one:",
                    term,
                    candidates.len()
                ),
            );
            for candidate in candidates {
                out.indented(&format!("- {}", candidate));
            }
        }
        other => out.status(Status::Error, &format!("Error: {}", other)),
    }

    if let CliError::Fetch(fetch_err) = err {
        if let Some(hint) = fetch_err.hint() {
            out.indented(hint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingOutput;
    use quantpull::{FetchResult, FileListing, ProgressCallback};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct FixedLister(Vec<&'static str>);

    impl RepositoryLister for FixedLister {
        fn list(&self, _repo: &RepositoryRef) -> FetchResult<FileListing> {
            Ok(self.0.iter().map(|f| f.to_string()).collect())
        }
    }

    /// Writes a small file and records what it was asked for.
    #[derive(Clone, Default)]
    struct WritingFetcher {
        requested: Arc<Mutex<Vec<String>>>,
    }

    impl ArtifactFetcher for WritingFetcher {
        fn fetch(
            &self,
            _repo: &RepositoryRef,
            filename: &str,
            destination_dir: &Path,
        ) -> FetchResult<FetchedArtifact> {
            self.requested.lock().unwrap().push(filename.to_string());
            let path = destination_dir.join(filename);
            std::fs::create_dir_all(destination_dir)
                .and_then(|_| std::fs::write(&path, b"gguf"))
                .map_err(|e| FetchError::filesystem(&path, e))?;
            Ok(FetchedArtifact {
                path,
                bytes: 4,
                resumed_from: 0,
                already_complete: false,
            })
        }

        fn fetch_with_progress(
            &self,
            repo: &RepositoryRef,
            filename: &str,
            destination_dir: &Path,
            on_progress: ProgressCallback,
        ) -> FetchResult<FetchedArtifact> {
            on_progress(4, 4);
            self.fetch(repo, filename, destination_dir)
        }
    }

    fn args(output: &Path) -> FetchArgs {
        FetchArgs {
            repo_id: "TheBloke/Llama-2-7B-GGUF".to_string(),
            quantization: "Q4_K_M".to_string(),
            output: output.to_path_buf(),
            revision: None,
            endpoint: None,
            timeout: None,
            strict: false,
            dry_run: false,
            show_progress: false,
        }
    }

    fn run_with(
        files: Vec<&'static str>,
        args: &FetchArgs,
        fetcher: &WritingFetcher,
        out: &RecordingOutput,
    ) -> Result<(), CliError> {
        let resolver = ArtifactResolver::new(FixedLister(files), fetcher.clone());
        let repo = RepositoryRef::new(args.repo_id.as_str()).unwrap();
        execute(
            &resolver,
            &repo,
            &SearchTerm::new(args.quantization.as_str()),
            args,
            out,
        )
    }

    #[test]
    fn test_unique_match_downloads_and_reports_path() {
        let temp = TempDir::new().unwrap();
        let out = RecordingOutput::default();
        let fetcher = WritingFetcher::default();

        run_with(
            vec!["README.md", "llama-2-7b.Q4_K_M.gguf", "llama-2-7b.Q8_0.gguf"],
            &args(temp.path()),
            &fetcher,
            &out,
        )
        .unwrap();

        let text = out.text();
        assert!(text.contains("[+] Match found: llama-2-7b.Q4_K_M.gguf"));
        assert!(text.contains("[+] Download successful!"));
        assert!(text.contains(&format!(
            "Saved to: {}",
            temp.path().join("llama-2-7b.Q4_K_M.gguf").display()
        )));
        assert!(temp.path().join("llama-2-7b.Q4_K_M.gguf").exists());
    }

    #[test]
    fn test_ambiguous_match_lists_every_candidate() {
        let temp = TempDir::new().unwrap();
        let out = RecordingOutput::default();
        let fetcher = WritingFetcher::default();
        let mut args = args(temp.path());
        args.quantization = "q4_0".to_string();

        run_with(vec!["a-q4_0.bin", "b-q4_0.bin"], &args, &fetcher, &out).unwrap();

        let text = out.text();
        assert!(text.contains("[!] Multiple files matched (2). Downloading the first one found: a-q4_0.bin"));
        assert!(text.contains("    - a-q4_0.bin"));
        assert!(text.contains("    - b-q4_0.bin"));
        assert_eq!(*fetcher.requested.lock().unwrap(), vec!["a-q4_0.bin"]);
    }

    #[test]
    fn test_dry_run_does_not_download() {
        let temp = TempDir::new().unwrap();
        let out = RecordingOutput::default();
        let fetcher = WritingFetcher::default();
        let mut args = args(&temp.path().join("out"));
        args.dry_run = true;

        run_with(vec!["model.Q4_K_M.gguf"], &args, &fetcher, &out).unwrap();

        assert!(out.text().contains("Dry run: would download model.Q4_K_M.gguf"));
        assert!(fetcher.requested.lock().unwrap().is_empty());
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_no_match_error_is_returned() {
        let temp = TempDir::new().unwrap();
        let out = RecordingOutput::default();
        let fetcher = WritingFetcher::default();

        let err = run_with(
            vec!["readme.md", "config.json"],
            &args(temp.path()),
            &fetcher,
            &out,
        )
        .unwrap_err();

        assert!(matches!(err, CliError::Fetch(FetchError::NoMatch { .. })));
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn test_report_no_match_lists_preview() {
        let out = RecordingOutput::default();
        let err = CliError::Fetch(FetchError::NoMatch {
            term: "Q4_K_M".to_string(),
            preview: vec!["readme.md".to_string(), "config.json".to_string()],
            total: 2,
        });

        report_error(&out, &err);

        assert_eq!(
            out.lines(),
            vec![
                "",
                "[!] Error: No files found matching 'Q4_K_M'.",
                "",
                "Available files in repository (showing first 2 of 2):",
                " - readme.md",
                " - config.json",
            ]
        );
    }

    #[test]
    fn test_report_empty_repository() {
        let out = RecordingOutput::default();
        let err = CliError::Fetch(FetchError::NoMatch {
            term: "Q4_K_M".to_string(),
            preview: Vec::new(),
            total: 0,
        });

        report_error(&out, &err);

        assert!(out.text().contains("The repository contains no files."));
    }

    #[test]
    fn test_report_repository_not_found_suggests_token() {
        let out = RecordingOutput::default();
        let err = CliError::Fetch(FetchError::RepositoryNotFound {
            repo: "org/missing".to_string(),
        });

        report_error(&out, &err);

        let text = out.text();
        assert!(text.contains("[!] Error: Repository 'org/missing' not found or is private."));
        assert!(text.contains("HF_TOKEN"));
    }

    #[test]
    fn test_report_strict_ambiguity_lists_candidates() {
        let out = RecordingOutput::default();
        let err = CliError::Fetch(FetchError::AmbiguousMatch {
            term: "q4_0".to_string(),
            candidates: vec!["a-q4_0.bin".to_string(), "b-q4_0.bin".to_string()],
        });

        report_error(&out, &err);

        let text = out.text();
        assert!(text.contains("matched 2 files and --strict requires exactly one"));
        assert!(text.contains("    - b-q4_0.bin"));
    }

    #[test]
    fn test_print_artifact_variants() {
        let out = RecordingOutput::default();
        print_artifact(
            &out,
            &FetchedArtifact {
                path: PathBuf::from("out/model.gguf"),
                bytes: 11,
                resumed_from: 5,
                already_complete: false,
            },
        );
        print_artifact(
            &out,
            &FetchedArtifact {
                path: PathBuf::from("out/model.gguf"),
                bytes: 11,
                resumed_from: 0,
                already_complete: true,
            },
        );

        let text = out.text();
        assert!(text.contains("Resumed from byte 5 of 11"));
        assert!(text.contains("[+] File already downloaded, nothing to do."));
    }

    #[test]
    fn test_hub_config_overrides() {
        let mut args = args(Path::new("."));
        args.endpoint = Some("http://mirror.local/".to_string());
        args.revision = Some("v1.0".to_string());
        args.timeout = Some(30);
        args.strict = true;

        let config = args.hub_config(HubConfig::new()).unwrap();

        assert_eq!(config.endpoint, "http://mirror.local");
        assert_eq!(config.revision, "v1.0");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.match_policy, MatchPolicy::RequireUnique);
    }

    #[test]
    fn test_hub_config_keeps_base_without_overrides() {
        let base = HubConfig::new().with_endpoint("http://env.local");

        let config = args(Path::new(".")).hub_config(base).unwrap();

        assert_eq!(config.endpoint, "http://env.local");
        assert_eq!(config.match_policy, MatchPolicy::FirstMatch);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut args = args(Path::new("."));
        args.timeout = Some(0);

        let result = args.hub_config(HubConfig::new());

        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
