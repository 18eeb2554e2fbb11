use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;

use commands::{docker, exec, git, server};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(version = VERSION)]
#[command(about = "CLI for provisioning servers, managed git clones, and Docker image workflows over SSH")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command on each target host and capture clean output
    Exec(exec::ExecArgs),
    /// Provision packages, Docker, and editor tooling on target hosts
    Server(server::ServerArgs),
    /// Set up target hosts for cloning private git repositories
    Git(git::GitArgs),
    /// Build, push, and pull Docker images
    Docker(docker::DockerArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = dockhand::output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
