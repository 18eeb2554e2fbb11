use dockhand::config::Settings;
use dockhand::host::Host;

pub type CmdResult<T> = dockhand::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod docker;
pub mod exec;
pub mod git;
pub mod server;

/// Resolve target hosts: `--host` flags win, the settings file is the
/// fallback. Flags work without any settings file at all.
pub fn resolve_hosts(host_flags: &[String]) -> dockhand::Result<Vec<Host>> {
    if !host_flags.is_empty() {
        return host_flags.iter().map(|spec| spec.parse::<Host>()).collect();
    }
    Settings::load()?.resolve_hosts()
}

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        dockhand::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (dockhand::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Exec(args) => dispatch!(args, global, exec),
        crate::Commands::Server(args) => dispatch!(args, global, server),
        crate::Commands::Git(args) => dispatch!(args, global, git),
        crate::Commands::Docker(args) => dispatch!(args, global, docker),
    }
}
