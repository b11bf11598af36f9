use footprint_editor::api::Backend;
use footprint_editor::collaborators::AcceptDefaults;
use footprint_editor::harness::RecordingSurface;
use footprint_editor::script::execute_json_batch;
use footprint_editor::{Editor, EditorSettings};

struct Args {
    script: Option<String>,
    api: Option<String>,
    local: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "footprint_editor=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    let Some(script) = read_script(args.script.as_deref()) else {
        std::process::exit(2);
    };

    let mut settings = EditorSettings::load();
    if let Some(url) = args.api {
        settings.api.base_url = url;
        settings.api.use_local = false;
    }
    if args.local {
        settings.api.use_local = true;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    let ok = local.block_on(&runtime, async move {
        let (surface, _log) = RecordingSurface::new();
        let backend = Backend::from_settings(&settings.api);
        let editor = Editor::new(&settings, Box::new(surface), backend, AcceptDefaults);

        match execute_json_batch(&editor, &script).await {
            Ok(responses) => {
                for response in &responses {
                    match serde_json::to_string(response) {
                        Ok(line) => println!("{line}"),
                        Err(e) => tracing::error!("Failed to encode response: {e}"),
                    }
                }
                responses.iter().all(|r| r.success)
            }
            Err(e) => {
                tracing::error!("{e}");
                false
            }
        }
    });

    if !ok {
        std::process::exit(1);
    }
}

/// `--script <path>` (stdin when absent), `--api <url>`, `--local`
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        script: None,
        api: None,
        local: false,
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--script" if i + 1 < args.len() => {
                parsed.script = Some(args[i + 1].clone());
                i += 1;
            }
            "--api" if i + 1 < args.len() => {
                parsed.api = Some(args[i + 1].clone());
                i += 1;
            }
            "--local" => parsed.local = true,
            other => tracing::warn!("Ignoring argument {other}"),
        }
        i += 1;
    }
    parsed
}

fn read_script(path: Option<&str>) -> Option<String> {
    let result = match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}")),
        None => std::io::read_to_string(std::io::stdin()).map_err(|e| format!("stdin: {e}")),
    };
    match result {
        Ok(script) => {
            tracing::info!("Loaded script ({} bytes)", script.len());
            Some(script)
        }
        Err(e) => {
            tracing::error!("Failed to read script {e}");
            None
        }
    }
}
