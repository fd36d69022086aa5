use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use depot_server::StorageBackend;

#[derive(Parser)]
#[command(
    name = "depot",
    about = "Depot: owner-scoped registry of packages and versioned artifacts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory of the filesystem backend (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum BackendArg {
    Memory,
    Filesystem,
}

impl From<BackendArg> for StorageBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => StorageBackend::Memory,
            BackendArg::Filesystem => StorageBackend::Filesystem,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Create, list, or show packages
    #[command(subcommand)]
    Package(PackageCommand),
    /// Publish, list, show, or fetch versions
    #[command(subcommand)]
    Version(VersionCommand),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub backend: Option<BackendArg>,
}

/// Paging options shared by listing commands.
#[derive(Args)]
pub struct PageArgs {
    /// Zero-based page number
    #[arg(long, default_value = "0")]
    pub page: u64,
    /// Items per page (default from configuration)
    #[arg(long)]
    pub size: Option<u64>,
}

#[derive(Subcommand)]
pub enum PackageCommand {
    /// Create a package
    Create {
        #[arg(long)]
        owner: String,
        reference: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List an owner's packages
    List {
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Show one package
    Show {
        #[arg(long)]
        owner: String,
        reference: String,
    },
}

#[derive(Subcommand)]
pub enum VersionCommand {
    /// Publish a file as a new version of a package
    Publish {
        #[arg(long)]
        owner: String,
        package: String,
        id: String,
        file: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Metadata entry as KEY=VALUE; repeatable
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },
    /// List a package's versions
    List {
        #[arg(long)]
        owner: String,
        package: String,
        #[command(flatten)]
        paging: PageArgs,
    },
    /// Show one version's metadata
    Show {
        #[arg(long)]
        owner: String,
        package: String,
        id: String,
    },
    /// Write a version's content to a file or stdout
    Fetch {
        #[arg(long)]
        owner: String,
        package: String,
        id: String,
        /// Destination file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli =
            Cli::try_parse_from(["depot", "serve", "--bind", "0.0.0.0:8080", "--backend", "memory"])
                .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert!(matches!(args.backend, Some(BackendArg::Memory)));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["depot", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_package_create() {
        let cli = Cli::try_parse_from([
            "depot", "package", "create", "--owner", "o1", "fw", "--name", "Firmware",
        ])
        .unwrap();
        if let Command::Package(PackageCommand::Create { owner, reference, name, description }) =
            cli.command
        {
            assert_eq!(owner, "o1");
            assert_eq!(reference, "fw");
            assert_eq!(name, "Firmware");
            assert!(description.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_package_list_paging() {
        let cli = Cli::try_parse_from([
            "depot", "package", "list", "--owner", "o1", "--page", "2", "--size", "5",
        ])
        .unwrap();
        if let Command::Package(PackageCommand::List { paging, .. }) = cli.command {
            assert_eq!(paging.page, 2);
            assert_eq!(paging.size, Some(5));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_version_publish_with_metadata() {
        let cli = Cli::try_parse_from([
            "depot", "version", "publish", "--owner", "o1", "fw", "1.0", "fw.bin", "--name",
            "First", "--meta", "arch=arm", "--meta", "rc=true",
        ])
        .unwrap();
        if let Command::Version(VersionCommand::Publish { file, metadata, .. }) = cli.command {
            assert_eq!(file, PathBuf::from("fw.bin"));
            assert_eq!(metadata, vec!["arch=arm", "rc=true"]);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_version_fetch() {
        let cli = Cli::try_parse_from([
            "depot", "version", "fetch", "--owner", "o1", "fw", "1.0", "-o", "out.bin",
        ])
        .unwrap();
        if let Command::Version(VersionCommand::Fetch { output, .. }) = cli.command {
            assert_eq!(output, Some(PathBuf::from("out.bin")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn owner_is_required() {
        assert!(Cli::try_parse_from(["depot", "package", "show", "fw"]).is_err());
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from([
            "depot", "--verbose", "--format", "json", "--data-dir", "/tmp/d", "package", "list",
            "--owner", "o",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/d")));
    }
}
