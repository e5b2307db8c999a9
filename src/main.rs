//! Installs the gitops CLI inside a CI job.
//!
//! Inputs arrive as `INPUT_<NAME>` environment variables, parsed by
//! [`OrthoConfig`](https://github.com/leynos/ortho-config). Outputs and the
//! `PATH` entry are written to the runner's command files. The binary exits
//! with status code `0` on success and `1` on error.

fn main() -> color_eyre::eyre::Result<()> {
    setup_gitops_cli::run().map_err(|err| color_eyre::eyre::eyre!(err))?;
    Ok(())
}
