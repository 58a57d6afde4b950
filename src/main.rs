use crate::areas::repository::Repository;
use crate::artifacts::errors::GfgError;
use crate::commands::plumbing::cat_file::CatFileMode;
use crate::commands::plumbing::hash_object::HashObjectSource;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod areas;
mod artifacts;
mod commands;

#[derive(Parser)]
#[command(
    name = "gfg",
    version = "0.1.0",
    about = "A simple git implementation",
    long_about = "This is a byte-compatible implementation of Git's object database, \
    index and tree/commit materialisation, written in Rust. It is not meant to be a \
    full replacement for git, but it can freely share a repository directory with it.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
    #[command(
        name = "cat-file",
        about = "Print the type or content of an object",
        long_about = "This command prints the content of an object in the repository. \
        The object may be named by a full SHA or a unique prefix of at least four hex characters."
    )]
    CatFile {
        #[arg(short = 't', help = "Print the object's type")]
        type_only: bool,
        #[arg(
            short = 'p',
            conflicts_with = "type_only",
            help = "Pretty-print the object's content"
        )]
        pretty: bool,
        #[arg(index = 1, value_name = "type|object")]
        first: String,
        #[arg(index = 2, value_name = "object")]
        second: Option<String>,
    },
    #[command(
        name = "hash-object",
        about = "Hash an object and optionally write it to the object database",
        long_about = "This command hashes a file (or standard input) as a blob and can \
        write it to the object database."
    )]
    HashObject {
        #[arg(
            short,
            long,
            required = false,
            help = "Write the object to the object database"
        )]
        write: bool,
        #[arg(long, help = "Read the payload from standard input")]
        stdin: bool,
        #[arg(index = 1, required_unless_present = "stdin")]
        file: Option<String>,
    },
    #[command(
        name = "add",
        about = "Add files or directories to the index",
        long_about = "This command adds the specified files or directories to the index. \
        It requires the paths of the files or directories to be specified."
    )]
    Add {
        #[arg(index = 1, required = true, help = "The files or directories to add to the index")]
        paths: Vec<String>,
    },
    #[command(
        name = "write-tree",
        about = "Write the index out as tree objects",
        long_about = "This command materialises tree objects for every directory whose \
        cached tree is stale and prints the root tree SHA."
    )]
    WriteTree,
    #[command(
        name = "commit-tree",
        about = "Create a commit object for an existing tree",
        long_about = "This command creates a commit object referencing the given tree and \
        prints the new commit SHA."
    )]
    CommitTree {
        #[arg(index = 1, help = "The tree SHA (short prefixes accepted)")]
        tree: String,
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(
        name = "commit",
        about = "Create a new commit with the specified message",
        long_about = "This command creates a new commit in the repository with the specified commit message."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(
        name = "log",
        about = "Show the commit history",
        long_about = "This command walks the commit history from HEAD and renders each commit."
    )]
    Log {
        #[arg(long, hide = true, help = "Disable colour escape sequences")]
        no_color: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(error) = run(&cli) {
        eprintln!("fatal: {error}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init { path } => {
            let target = match path {
                Some(path) => PathBuf::from(path),
                None => std::env::current_dir()?,
            };
            let mut repository = Repository::new(target, Box::new(std::io::stdout()))?;

            repository.init()
        }
        Commands::CatFile {
            type_only,
            pretty,
            first,
            second,
        } => {
            let mut repository = discovered_repository()?;

            let (mode, object) = if *type_only || *pretty {
                if second.is_some() {
                    return Err(GfgError::InvalidArgument(
                        "too many arguments for cat-file".to_string(),
                    )
                    .into());
                }
                let mode = if *type_only {
                    CatFileMode::TypeOnly
                } else {
                    CatFileMode::Pretty
                };
                (mode, first.clone())
            } else {
                let object = second.clone().ok_or_else(|| {
                    GfgError::InvalidArgument("cat-file requires an <object>".to_string())
                })?;
                (CatFileMode::Expect(first.clone()), object)
            };

            repository.cat_file(&mode, &object)
        }
        Commands::HashObject { write, stdin, file } => {
            let mut repository = discovered_repository()?;

            let source = if *stdin {
                HashObjectSource::Stdin
            } else {
                let file = file.clone().ok_or_else(|| {
                    GfgError::InvalidArgument("hash-object requires a <file>".to_string())
                })?;
                HashObjectSource::File(file)
            };

            repository.hash_object(&source, *write)
        }
        Commands::Add { paths } => {
            let mut repository = discovered_repository()?;

            repository.add(paths)
        }
        Commands::WriteTree => {
            let mut repository = discovered_repository()?;

            repository.write_tree()
        }
        Commands::CommitTree { tree, message } => {
            let mut repository = discovered_repository()?;

            repository.commit_tree(tree, message)
        }
        Commands::Commit { message } => {
            let mut repository = discovered_repository()?;

            repository.commit(message)
        }
        Commands::Log { no_color } => {
            if *no_color {
                colored::control::set_override(false);
            }
            let mut repository = discovered_repository()?;

            repository.log()
        }
    }
}

fn discovered_repository() -> Result<Repository> {
    let pwd = std::env::current_dir()?;

    Repository::discover(pwd, Box::new(std::io::stdout()))
}
