//! HTML template rendering over the views directory.

use std::path::{Path, PathBuf};

use minijinja::{path_loader, Environment};
use serde::Serialize;

use crate::error::Result;

/// Template engine. Views are addressed without their `.html` suffix.
///
/// With `watch` enabled every render reads the templates from disk again, so
/// edits show up without a restart.
pub struct Templates {
    dir: PathBuf,
    cached: Option<Environment<'static>>,
}

impl Templates {
    pub fn new(dir: impl Into<PathBuf>, watch: bool) -> Self {
        let dir = dir.into();
        let cached = (!watch).then(|| build_environment(&dir));
        Self { dir, cached }
    }

    pub fn render<S: Serialize>(&self, view: &str, context: S) -> Result<String> {
        let fresh;
        let env = match &self.cached {
            Some(env) => env,
            None => {
                fresh = build_environment(&self.dir);
                &fresh
            }
        };

        let template = env.get_template(&format!("{}.html", view))?;
        Ok(template.render(context)?)
    }
}

fn build_environment(dir: &Path) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(path_loader(dir));
    env
}
