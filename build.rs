// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("satchel")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Satchel Contributors")
        .about("File-based package manager with a transactional catalog")
        .subcommand_required(false)
        .arg(
            Arg::new("db")
                .short('d')
                .long("db")
                .value_name("PATH")
                .global(true)
                .default_value("/var/lib/satchel/satchel.db")
                .help("Path to the catalog database"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Verbose error reporting and debug-level logs"),
        )
        .subcommand(
            Command::new("install")
                .about("Build recipes and install them as one batch")
                .arg(
                    Arg::new("recipes")
                        .required(true)
                        .num_args(1..)
                        .help("Recipe files to build and install together"),
                )
                .arg(
                    Arg::new("no_deps")
                        .long("no-deps")
                        .action(ArgAction::SetTrue)
                        .help("Downgrade failed dependency checks to warnings"),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Reserved: bypass file conflicts (not implemented)"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove installed packages")
                .arg(
                    Arg::new("packages")
                        .required(true)
                        .num_args(1..)
                        .help("Package names to remove"),
                )
                .arg(
                    Arg::new("no_deps")
                        .long("no-deps")
                        .action(ArgAction::SetTrue)
                        .help("Downgrade failed dependency checks to warnings"),
                )
                .arg(
                    Arg::new("hard")
                        .long("hard")
                        .action(ArgAction::SetTrue)
                        .help("Remove modified files too, after renaming them to a backup"),
                ),
        )
        .subcommand(
            Command::new("query")
                .about("Query installed packages")
                .arg(
                    Arg::new("patterns")
                        .num_args(0..)
                        .help("Name patterns (SQL LIKE wildcards); all packages if omitted"),
                )
                .arg(
                    Arg::new("files")
                        .long("files")
                        .action(ArgAction::SetTrue)
                        .help("List the files owned by each match"),
                )
                .arg(
                    Arg::new("info")
                        .long("info")
                        .action(ArgAction::SetTrue)
                        .help("Show manifest details for each match"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(Arg::new("shell").required(true).help("Shell type")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("satchel.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
