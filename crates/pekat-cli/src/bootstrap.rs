//! CLI bootstrap - the composition root.
//!
//! Turns parsed arguments and environment into an [`Analyzer`]: either a
//! locally started server or an attachment to a remote one.

use pekat_core::{AnalyzerConfig, LocalLaunch, RemoteTarget};
use pekat_runtime::Analyzer;
use tracing::debug;

use crate::error::CliError;
use crate::parser::{Cli, TargetArgs};

/// Where the analyzer comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local(LocalLaunch),
    Remote(RemoteTarget),
}

/// Pick the target from the arguments.
///
/// `--host` selects a remote server and needs `--port`; the local launch
/// options are then rejected. Otherwise `--project` is required and `--dist`
/// falls back to `PEKAT_DIST_PATH`.
pub fn resolve_target(args: &TargetArgs, api_key: Option<String>) -> Result<Target, CliError> {
    if let Some(host) = &args.host {
        let port = args
            .port
            .ok_or_else(|| CliError::Arguments("--host requires --port".into()))?;
        if args.project.is_some() || args.dist.is_some() || args.options.is_some() {
            return Err(CliError::Arguments(
                "--dist, --project and --options only apply to a locally started server".into(),
            ));
        }
        return Ok(Target::Remote(RemoteTarget::new(host.clone(), port, api_key)));
    }

    if args.port.is_some() {
        return Err(CliError::Arguments("--port requires --host".into()));
    }
    let project = args.project.clone().ok_or_else(|| {
        CliError::Arguments("either --host/--port or --project must be given".into())
    })?;

    let mut launch = LocalLaunch::from_env(project)
        .with_api_key(api_key)
        .with_extra_options(args.options.clone());
    if let Some(dist) = &args.dist {
        launch = launch.with_dist_path(dist);
    }
    Ok(Target::Local(launch))
}

/// Analyzer settings from the environment, overridden by flags.
pub fn analyzer_config(cli: &Cli) -> AnalyzerConfig {
    let config = AnalyzerConfig::from_env();
    if cli.context_in_body {
        config.with_context_in_body(true)
    } else {
        config
    }
}

/// Start or attach the analyzer the command line asks for.
pub async fn connect(cli: &Cli) -> Result<Analyzer, CliError> {
    let config = analyzer_config(cli);
    let analyzer = match resolve_target(&cli.target, cli.api_key.clone())? {
        Target::Local(launch) => {
            debug!(project = %launch.project_path.display(), "Starting local server");
            Analyzer::start_local(launch, &config).await?
        }
        Target::Remote(target) => {
            debug!(host = %target.host, port = %target.port, "Attaching to remote server");
            Analyzer::connect_remote(target, &config).await?
        }
    };
    Ok(analyzer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> TargetArgs {
        TargetArgs::default()
    }

    #[test]
    fn host_and_port_select_remote() {
        let target = resolve_target(
            &TargetArgs {
                host: Some("10.0.0.5".into()),
                port: Some(8000),
                ..args()
            },
            Some("key".into()),
        )
        .unwrap();
        assert_eq!(
            target,
            Target::Remote(RemoteTarget::new("10.0.0.5", 8000, Some("key".into())))
        );
    }

    #[test]
    fn project_selects_local_launch() {
        let target = resolve_target(
            &TargetArgs {
                project: Some(PathBuf::from("/data/bottles")),
                dist: Some(PathBuf::from("/opt/pekat")),
                options: Some("-tries 2".into()),
                ..args()
            },
            Some("  ".into()),
        )
        .unwrap();

        let Target::Local(launch) = target else {
            panic!("expected local target");
        };
        assert_eq!(launch.project_path, PathBuf::from("/data/bottles"));
        assert_eq!(launch.dist_path, Some(PathBuf::from("/opt/pekat")));
        assert_eq!(launch.extra_options.as_deref(), Some("-tries 2"));
        assert_eq!(launch.api_key(), None);
    }

    #[test]
    fn host_without_port_is_rejected() {
        let err = resolve_target(
            &TargetArgs {
                host: Some("h".into()),
                ..args()
            },
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("--port"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn remote_with_local_options_is_rejected() {
        let err = resolve_target(
            &TargetArgs {
                host: Some("h".into()),
                port: Some(1),
                project: Some(PathBuf::from("/p")),
                ..args()
            },
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Arguments(_)));
    }

    #[test]
    fn no_target_is_rejected() {
        assert!(matches!(
            resolve_target(&args(), None),
            Err(CliError::Arguments(_))
        ));
    }
}
