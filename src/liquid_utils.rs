pub mod partials;

use crate::{
    cfg::Settings,
    error::{ClubError, JoinSnafu, LiquidAction, LiquidSnafu, ThreadReason},
    liquid_utils::partials::Partials,
    state::cache::ClubCache,
};
use axum::response::Html;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use liquid::{model::Value, Object, ParserBuilder};
use snafu::ResultExt;
use std::{fmt::Debug, path::Path};

pub trait CustomFormat {
    fn to_env_string(&self, format: &str) -> String;
}

impl CustomFormat for NaiveDate {
    fn to_env_string(&self, format: &str) -> String {
        self.format(format).to_string()
    }
}
impl CustomFormat for NaiveTime {
    fn to_env_string(&self, format: &str) -> String {
        self.format(format).to_string()
    }
}
impl CustomFormat for DateTime<Utc> {
    fn to_env_string(&self, format: &str) -> String {
        self.format(format).to_string()
    }
}

pub async fn compile(
    path: impl AsRef<Path> + Debug,
    globals: Object,
    settings: &Settings,
    cache: &ClubCache,
) -> Result<Html<String>, ClubError> {
    compile_with_newtitle(path, globals, settings, cache, None).await
}

#[instrument(level = "debug", skip(globals, settings, cache))]
pub async fn compile_with_newtitle(
    path: impl AsRef<Path> + Debug,
    mut globals: Object,
    settings: &Settings,
    cache: &ClubCache,
    title_additional_info: Option<String>,
) -> Result<Html<String>, ClubError> {
    debug!("Reading in file + partials");

    let liquid = cache.get(path).await?.to_string();
    let partial_compiler = Partials::from_cache(cache).await.to_compiler();

    debug!("Inserting globals");

    let project_name = settings.brand.instance_name.clone();
    let title = match title_additional_info {
        None => project_name.clone(),
        Some(x) => format!("{x} - {project_name}"),
    };

    globals.insert(
        "siteinfo".into(),
        Value::Object(liquid::object!({
            "instance_name": project_name,
            "html_title": title,
        })),
    );

    let html: Result<String, ClubError> = tokio::task::spawn_blocking(move || {
        debug!("Compiling");
        let res = ParserBuilder::with_stdlib()
            .partials(partial_compiler)
            .build()
            .context(LiquidSnafu {
                attempt: LiquidAction::BuildingCompiler,
            })?
            .parse(&liquid)
            .with_context(|_e| LiquidSnafu {
                attempt: LiquidAction::Parsing { text: liquid },
            })?
            .render(&globals)
            .context(LiquidSnafu {
                attempt: LiquidAction::Rendering,
            })?;
        Ok(res)
    })
    .await
    .context(JoinSnafu {
        title: ThreadReason::LiquidCompiler,
    })?;

    Ok(Html(html?))
}
