use std::io::{self, Write};

use tracing_subscriber::EnvFilter;

use bl_notebook::{run_maximize, run_minimize, show_tuple_rejection, NotebookConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config = NotebookConfig::load()?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "== gp_minimize ==")?;
    run_minimize(&config, &mut out)?;

    writeln!(out)?;
    writeln!(out, "== BayesianOptimization ==")?;
    run_maximize(&config, &mut out)?;

    writeln!(out)?;
    writeln!(out, "== tuple dimensions ==")?;
    show_tuple_rejection(&mut out)?;

    out.flush()?;
    Ok(())
}
