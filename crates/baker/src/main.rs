//! Offline mesh baker: one OBJ in, one binary artifact out.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use asset::bake::{bake_model, save_bake};
use asset::obj::load_obj_from_path;

fn parse_args() -> Result<(PathBuf, PathBuf)> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;

    for arg in std::env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--out=") {
            output = Some(PathBuf::from(val));
        } else if arg.starts_with("--") {
            bail!("Unknown option '{}'", arg);
        } else if input.is_some() {
            bail!("More than one input file given");
        } else {
            input = Some(PathBuf::from(arg));
        }
    }

    let input = input.context("usage: baker <model.obj> [--out=<path>]")?;
    let output = output.unwrap_or_else(|| input.with_extension("bin"));
    Ok((input, output))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (input, output) = parse_args()?;
    log::info!("Baking {} -> {}", input.display(), output.display());

    let mesh = load_obj_from_path(&input)?;
    let model = bake_model(mesh)?;
    save_bake(&model, &output)?;

    Ok(())
}
