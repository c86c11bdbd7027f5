//! The `sites` command parses the registry file without touching a browser.

use std::io::Write;
use std::path::PathBuf;

use wakefleet_cli::cli::{Cli, Commands};
use wakefleet_cli::commands;

#[tokio::test]
async fn sites_command_reads_registry_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "https://a.example/\n# comment\nhttps://b.example/").unwrap();

    let cli = Cli {
        verbose: 0,
        sites: file.path().to_path_buf(),
        cdp_endpoint: None,
        launch: false,
        command: Commands::Sites,
    };
    assert!(commands::dispatch(cli).await.is_ok());
}

#[tokio::test]
async fn sites_command_surfaces_unavailable_registry() {
    let cli = Cli {
        verbose: 0,
        sites: PathBuf::from("/nonexistent/wakefleet-sites.txt"),
        cdp_endpoint: None,
        launch: false,
        command: Commands::Sites,
    };

    let err = commands::dispatch(cli).await.unwrap_err();
    assert!(err.to_string().contains("unavailable"));
}
