use benchrun::{
    catalog::{self, Catalog, Selection},
    cli::{exit, Opts},
    errors::Error,
    executor::{Controller, Engine, RunStatus, ShellBackend},
    params::ParameterSet,
    results::ResultSink,
};

use colored::Colorize;
use log::{info, warn, LevelFilter};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tokio::{runtime, signal};

fn init_logging(level: LevelFilter, output: &Option<PathBuf>) {
    let mut dispatcher = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        // Stdout carries the per-case report lines; logs go to stderr.
        .chain(std::io::stderr());

    if let Some(log_file) = output {
        match fern::log_file(log_file) {
            Ok(file) => dispatcher = dispatcher.chain(file),
            Err(err) => {
                eprintln!("cannot open log file {}: {}", log_file.display(), err)
            }
        }
    }
    let _ = dispatcher.apply();
}

fn resolve_selection(
    catalog: &Catalog,
    opts: &Opts,
) -> Result<Selection, Error> {
    if let Some(item) = &opts.start_test {
        let path = item.parse()?;
        catalog.resolve_single(&path)
    } else if let Some(file) = &opts.multi_items {
        let paths = catalog::paths_from_file(file)?;
        catalog.resolve_multi(&paths)
    } else {
        Ok(Vec::new())
    }
}

fn run() -> i32 {
    let opts = Opts::from_args();
    init_logging(opts.log_level.into(), &opts.log_file);

    let project_file = match &opts.project {
        Some(file) => file.clone(),
        None => {
            eprintln!("Please enter the project file name or --help.");
            return exit::NO_PROJECT;
        }
    };

    let catalog = match Catalog::load(&project_file) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("error: {}", err);
            return exit::LOAD_UNITS;
        }
    };

    let params = match &opts.parameters {
        Some(file) => match ParameterSet::load(file) {
            Ok(params) => params,
            Err(err) => {
                eprintln!("error: {}", err);
                return exit::LOAD_PARAMS;
            }
        },
        None => ParameterSet::empty(),
    };

    let mut sink = ResultSink::new(
        opts.results_dir.clone(),
        catalog.upload_url().map(String::from),
    );

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();

    if opts.list {
        return runtime.block_on(async {
            for path in catalog.list() {
                println!("{}", path.to_string().blue());
            }
            // Listing is the idle moment on the line, so push any result
            // history that is still waiting for the server.
            match sink.upload_history().await {
                Ok(n) if n > 0 => info!("uploaded {} pending run records", n),
                Ok(_) => {}
                Err(err) => warn!("history upload failed: {}", err),
            }
            exit::OK
        });
    }

    let project_dir = project_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let backend = match ShellBackend::init(project_dir) {
        Ok(backend) => backend,
        Err(err) => {
            eprintln!("error: {}", err);
            return exit::INIT_RUNNER;
        }
    };

    if let Err(err) = sink.init(
        opts.user.as_deref().unwrap_or(""),
        opts.station.as_deref().unwrap_or(""),
        opts.workline.as_deref().unwrap_or(""),
        opts.barcode.as_deref().unwrap_or(""),
    ) {
        eprintln!("error: {}", err);
        return exit::INIT_RESULT;
    }

    let selection = match resolve_selection(&catalog, &opts) {
        Ok(selection) => selection,
        Err(err) => {
            eprintln!("error: {}", err);
            return exit::UNSELECTED;
        }
    };
    if selection.is_empty() {
        eprintln!(
            "error: no test items selected. \
             Use --start-test, --multi-items, or --list-item."
        );
        return exit::UNSELECTED;
    }

    let engine = Engine::new(backend, params);
    let controller = Controller::new();

    runtime.block_on(async {
        let abort = controller.abort_handle();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("interrupt received, aborting after the current case");
                abort.abort();
            }
        });

        let result = match controller
            .start(&engine, &selection, opts.stop_on_failure, &mut sink)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                let _ = sink.finalize();
                eprintln!("error: {}", err);
                return exit::RUNNING;
            }
        };

        if let Err(err) = sink.finalize() {
            eprintln!("error: {}", err);
            return exit::RUNNING;
        }

        let summary = format!(
            "{} of {} cases executed",
            result.executed,
            selection.len()
        );
        match result.status {
            RunStatus::Completed => {
                println!("  {} ({})", "completed".green(), summary);
                exit::OK
            }
            RunStatus::Failed => {
                println!("  {} ({})", "failed".red(), summary);
                exit::RUNNING
            }
            RunStatus::Aborted => {
                println!("  {} ({})", "aborted".yellow(), summary);
                exit::RUNNING
            }
        }
    })
}

fn main() {
    std::process::exit(run());
}
