//! Command-line and environment configuration for xhsq

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Default)]
#[clap(rename_all = "lowercase")]
pub enum DatabaseAuthMethod {
    #[default]
    None,
    Root,
}

#[derive(Args, Debug, Clone)]
pub struct DatabaseConfig {
    /// SurrealDB endpoint, e.g. `surrealkv://./database`, `mem://` or `ws://host:8000`
    #[clap(long, env = "XHSQ_DATABASE_URL", default_value = "surrealkv://./database")]
    pub database_url: String,

    #[clap(long, env = "XHSQ_DATABASE_AUTH_METHOD", value_enum, default_value = "none")]
    pub db_auth_method: DatabaseAuthMethod,

    #[clap(long, env = "XHSQ_SURREAL_ROOT_USERNAME", default_value = "root")]
    #[clap(required_if_eq("db_auth_method", "root"))]
    pub root_username: Option<String>,

    #[clap(long, env = "XHSQ_SURREAL_ROOT_PASSWORD", default_value = "root")]
    #[clap(required_if_eq("db_auth_method", "root"))]
    pub root_password: Option<String>,

    #[clap(long, env = "XHSQ_SURREAL_NAMESPACE", default_value = "xhsq")]
    pub db_namespace: String,

    #[clap(long, env = "XHSQ_SURREAL_DATABASE", default_value = "xhsq")]
    pub db_database: String,
}

impl DatabaseConfig {
    /// In-memory database, used by tests.
    #[cfg(test)]
    pub fn memory() -> Self {
        Self {
            database_url: "mem://".to_string(),
            db_auth_method: DatabaseAuthMethod::None,
            root_username: None,
            root_password: None,
            db_namespace: "xhsq".to_string(),
            db_database: "test".to_string(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct WorkerConfig {
    /// XHS-Downloader detail endpoint the worker posts links to
    #[clap(
        long,
        env = "XHSQ_XHS_API_URL",
        default_value = "http://localhost:5556/xhs/detail"
    )]
    pub xhs_api_url: String,

    /// Seconds to wait before polling again when nothing is pending
    #[clap(long, env = "XHSQ_IDLE_SECONDS", default_value_t = 30)]
    pub idle_seconds: u64,

    /// Timeout for a single XHS API call
    #[clap(long, env = "XHSQ_REQUEST_TIMEOUT", default_value_t = 120)]
    pub request_timeout: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    #[clap(long, env = "XHSQ_HOST", default_value = "0.0.0.0:8080")]
    pub host: String,

    /// Directory holding the web dashboard (`index.html`, `dashboard.html`, assets)
    #[clap(long, env = "XHSQ_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Serve the API only, without the embedded download worker
    #[clap(long, env = "XHSQ_NO_WORKER", default_value = "false")]
    pub no_worker: bool,

    #[clap(flatten)]
    pub db_config: DatabaseConfig,

    #[clap(flatten)]
    pub worker_config: WorkerConfig,
}

#[derive(Args, Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the queue server API
    #[clap(
        long = "api",
        global = true,
        env = "XHSQ_API_URL",
        default_value = "http://localhost:8080/api"
    )]
    pub api_url: url::Url,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "xhsq", version, about = "Queue-based Xiaohongshu downloader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(flatten)]
    pub client: ClientConfig,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API (and the download worker unless --no-worker)
    Serve(ServerConfig),
    /// Run only the download worker against the shared database
    Worker {
        #[clap(flatten)]
        db_config: DatabaseConfig,
        #[clap(flatten)]
        worker_config: WorkerConfig,
    },
    /// Create one sub-directory per category under the configured download path
    Folders {
        #[clap(flatten)]
        db_config: DatabaseConfig,
        /// Base directory; defaults to the stored download path
        #[clap(long)]
        base: Option<PathBuf>,
    },
    #[command(flatten)]
    Client(ClientCommand),
}

/// Commands that talk to a running server over HTTP
#[derive(Subcommand, Debug, Clone)]
pub enum ClientCommand {
    /// Queue a link for download
    Add {
        url: String,
        #[clap(short, long)]
        category: Option<String>,
    },
    /// Show queue statistics and items
    Queue {
        /// Show every recent item instead of only pending ones
        #[clap(short, long)]
        all: bool,
    },
    /// Re-render the queue every 10 seconds until interrupted
    Watch {
        #[clap(short, long)]
        all: bool,
    },
    /// Delete a single queue item
    Delete { id: String },
    /// Delete every pending item
    Clear {
        /// Skip the confirmation prompt
        #[clap(short, long)]
        yes: bool,
    },
    /// List categories with item counts
    Categories,
    /// Show or change the downloader config
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Queue every link listed in a file, one per line
    Import {
        #[clap(default_value = "xhs_links.txt")]
        file: PathBuf,
        #[clap(short, long)]
        category: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    Show,
    Set {
        #[clap(long)]
        download_path: Option<String>,
        #[clap(long)]
        delay_seconds: Option<u64>,
    },
}

pub fn cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_commands() {
        let cli = Cli::try_parse_from([
            "xhsq",
            "--api",
            "http://10.0.0.2:8080/api",
            "add",
            "https://xhslink.com/a/x",
            "-c",
            "food",
        ])
        .unwrap();
        assert_eq!(cli.client.api_url.as_str(), "http://10.0.0.2:8080/api");
        match cli.command {
            Command::Client(ClientCommand::Add { url, category }) => {
                assert_eq!(url, "https://xhslink.com/a/x");
                assert_eq!(category.as_deref(), Some("food"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_config_set() {
        let cli =
            Cli::try_parse_from(["xhsq", "config", "set", "--delay-seconds", "90"]).unwrap();
        match cli.command {
            Command::Client(ClientCommand::Config(ConfigCommand::Set {
                download_path,
                delay_seconds,
            })) => {
                assert!(download_path.is_none());
                assert_eq!(delay_seconds, Some(90));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_flags() {
        let cli = Cli::try_parse_from([
            "xhsq",
            "serve",
            "--host",
            "127.0.0.1:9000",
            "--no-worker",
            "--database-url",
            "mem://",
        ])
        .unwrap();
        let Command::Serve(server) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(server.host, "127.0.0.1:9000");
        assert!(server.no_worker);
        assert_eq!(server.db_config.database_url, "mem://");
    }

    #[test]
    fn client_commands_are_grouped() {
        for args in [
            vec!["xhsq", "categories"],
            vec!["xhsq", "queue", "--all"],
            vec!["xhsq", "import", "links.txt", "-c", "food"],
        ] {
            let cli = Cli::try_parse_from(args.clone()).unwrap();
            assert!(matches!(cli.command, Command::Client(_)), "{args:?}");
        }
        let cli = Cli::try_parse_from(["xhsq", "worker"]).unwrap();
        assert!(matches!(cli.command, Command::Worker { .. }));
    }
}
