use crate::{
    auth::backend::ClubAuthBackend, membership::RegistrationRefusal, progression::InvalidLevel,
};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse},
};
use http::Uri;
use snafu::Snafu;
use std::path::PathBuf;

pub type ALError = axum_login::Error<ClubAuthBackend>;

#[derive(Debug)]
pub enum LoginFailureReason {
    MissingPassword,
}

#[derive(Debug)]
pub enum WhatToParse {
    PartOfAWorkshop(WorkshopField),
    PartOfAReward(RewardField),
}

impl From<WorkshopField> for WhatToParse {
    fn from(value: WorkshopField) -> Self {
        Self::PartOfAWorkshop(value)
    }
}
impl From<RewardField> for WhatToParse {
    fn from(value: RewardField) -> Self {
        Self::PartOfAReward(value)
    }
}

#[derive(Debug)]
pub enum WorkshopField {
    Points,
    MinLevel,
}

#[derive(Debug)]
pub enum RewardField {
    PointsCost,
    MinLevel,
    Quantity,
}

#[derive(Debug)]
pub enum FileIdentifier {
    PB(PathBuf),
}

#[derive(Debug)]
pub enum IOAction {
    ReadingFile(FileIdentifier),
    BindingListener(String),
    Serving,
}

#[derive(Debug)]
pub enum SerdeJsonAction {
    SessionSerde,
}

#[derive(Debug)]
pub enum LiquidAction {
    BuildingCompiler,
    Parsing { text: String },
    Rendering,
}

#[derive(Debug)]
pub enum ThreadReason {
    LiquidCompiler,
    ReadingSettings,
}

#[derive(Debug)]
pub enum DatabaseIDMethod {
    Id(String),
    Email(String),
}
impl From<&str> for DatabaseIDMethod {
    fn from(value: &str) -> Self {
        Self::Id(value.to_string())
    }
}

#[derive(Debug, Copy, Clone)]
pub enum RecordKind {
    Member,
    Workshop,
    Reward,
}

#[derive(Debug)]
pub enum SqlxAction {
    Connecting,
    FindingMember(DatabaseIDMethod),
    FindingMembers,
    CountingMembers,
    AddingMember,
    UpdatingMember(DatabaseIDMethod),
    RemovingMember(DatabaseIDMethod),

    FindingWorkshop(String),
    FindingAllWorkshops,
    CountingWorkshops,
    AddingWorkshop,
    UpdatingWorkshop(String),
    RemovingWorkshop(String),

    FindingReward(String),
    FindingAllRewards,
    CountingRewards,
    AddingReward,
    UpdatingReward(String),
    RemovingReward(String),

    FindingSession(String),
    AddingSession(String),
    RemovingSession(String),
    DeletingOldSessions,
}

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum ClubError {
    //external errors
    #[snafu(display("Database Error: {source:?}. Cause: {action:?}"))]
    Sqlx {
        source: sqlx::Error,
        action: SqlxAction,
    },
    #[snafu(display("Error running migrations: {source:?}"), context(false))]
    Migrate { source: sqlx::migrate::MigrateError },
    #[snafu(display("Liquid Error: {source:?} caused by {attempt:?}"))]
    Liquid {
        source: liquid::Error,
        attempt: LiquidAction,
    },
    #[snafu(display("IO Error: {source:?} doing {action:?}"))]
    IO {
        source: std::io::Error,
        action: IOAction,
    },
    #[snafu(display("Tokio Join Error: {source:?} which was started to {title:?}"))]
    Join {
        source: tokio::task::JoinError,
        title: ThreadReason,
    },
    #[snafu(display("Error Parsing Integer: {source:?} trying to get a {what_to_convert_to:?}"))]
    ParseInt {
        source: std::num::ParseIntError,
        what_to_convert_to: WhatToParse,
    },
    #[snafu(display("Error Parsing {original:?} - {source:?}"))]
    ParseTime {
        source: chrono::ParseError,
        original: String,
    },
    #[snafu(display("JSON error: {source:?} whilst trying to {action:?}"))]
    SerdeJson {
        source: serde_json::Error,
        action: SerdeJsonAction,
    },
    #[snafu(display("Error reading settings: {source:?}"), context(false))]
    Config { source: config::ConfigError },
    #[snafu(display("Error with sessions: {source:?}"), context(false))]
    Session {
        source: tower_sessions::session::Error,
    },
    #[snafu(display("Not able page {was_looking_for:?}"))]
    PageNotFound { was_looking_for: Uri },

    // internal errors
    #[snafu(display("Could not find {kind:?} with id {id:?}"))]
    MissingRecord { kind: RecordKind, id: String },
    #[snafu(display("Failure to login due to {reason:?}"))]
    LoginFailure { reason: LoginFailureReason },
    #[snafu(display("Invalid level: {source}"), context(false))]
    Level { source: InvalidLevel },
    #[snafu(display("Could not register: {source}"), context(false))]
    Registration { source: RegistrationRefusal },
}

impl From<ALError> for ClubError {
    fn from(value: ALError) -> Self {
        match value {
            ALError::Session(source) => Self::Session { source },
            ALError::Backend(e) => e,
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
pub fn get_error_page(error_code: StatusCode, content: ClubError) -> (StatusCode, Html<String>) {
    error!(
        ?content,
        ?error_code,
        "Dealing with Error page: {content:#?}"
    );

    (
        error_code,
        Html(format!(
            include_str!("../www/server_error.html"),
            error = content,
            code = error_code
        )),
    )
}

#[axum::debug_handler]
pub async fn not_found_fallback(uri: Uri) -> (StatusCode, Html<String>) {
    get_error_page(
        StatusCode::NOT_FOUND,
        ClubError::PageNotFound {
            was_looking_for: uri,
        },
    )
}

impl IntoResponse for ClubError {
    fn into_response(self) -> axum::response::Response {
        let code = match &self {
            ClubError::Sqlx {
                source: sqlx::Error::RowNotFound,
                ..
            }
            | ClubError::MissingRecord { .. }
            | ClubError::PageNotFound { .. } => StatusCode::NOT_FOUND,
            ClubError::ParseInt { .. }
            | ClubError::ParseTime { .. }
            | ClubError::Level { .. }
            | ClubError::LoginFailure { .. }
            | ClubError::Registration { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        get_error_page(code, self).into_response()
    }
}
