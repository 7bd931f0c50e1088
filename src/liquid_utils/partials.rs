use crate::state::cache::ClubCache;
use liquid::partials::{EagerCompiler, InMemorySource};
use std::ffi::OsStr;

const PARTIALS_DIR: &str = "www/partials/";
const LIQUID_PARTIALS_NAME: &str = "partials/";
const PARTIALS_EXTENSIONS: &[&str] = &["html", "liquid"];

#[derive(Debug)]
pub struct Partials(InMemorySource);

impl Partials {
    ///Builds the partials source out of whatever is in `www/partials/`, going through the template cache.
    pub async fn from_cache(cache: &ClubCache) -> Self {
        let mut in_memory_source = InMemorySource::new();

        for (partial, source) in cache.walk(PARTIALS_DIR).await {
            if !partial
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| PARTIALS_EXTENSIONS.contains(&ext))
            {
                continue;
            }

            if let Some(name) = partial.file_name().and_then(OsStr::to_str) {
                trace!(?partial, "Got partial");
                in_memory_source.add(LIQUID_PARTIALS_NAME.to_string() + name, source.to_string());
            } else {
                error!(?partial, "Got partial, could not transform name to UTF-8");
            }
        }

        Self(in_memory_source)
    }

    pub fn to_compiler(&self) -> EagerCompiler<InMemorySource> {
        EagerCompiler::new(self.0.clone())
    }
}
