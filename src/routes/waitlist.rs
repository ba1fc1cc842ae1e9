use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};

use crate::domain::new_signup::{NewSignup, NewSignupBody};
use crate::store::{StoreError, SubmitOutcome, WaitlistStore};

const ACCEPTED_MESSAGE: &str = "Successfully added to waitlist";
const DUPLICATE_MESSAGE: &str = "Email already on waitlist";
const INVALID_EMAIL_ERROR: &str = "Invalid email address";
const INVALID_BODY_ERROR: &str = "Invalid request body";
const INTERNAL_ERROR: &str = "Internal Server Error";

#[derive(serde::Serialize)]
struct MessageBody {
    message: &'static str,
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[tracing::instrument(
    name = "Joining the waitlist handler",
    skip(body, store),
    fields(
        email = ?body.email
    )
)]
pub async fn handle_join_waitlist(
    body: web::Json<NewSignupBody>,
    store: web::Data<WaitlistStore>,
) -> Result<HttpResponse, WaitlistError> {
    let new_signup: NewSignup = body.try_into().map_err(|err| {
        tracing::info!("Validation error: {}", err);
        WaitlistError::InvalidEmail(err)
    })?;

    let outcome = store.submit(new_signup.email).await.map_err(|err| {
        tracing::error!("Failed to store the waitlist signup: {:?}", err);
        WaitlistError::Unexpected(err)
    })?;

    match outcome {
        SubmitOutcome::Accepted(_) => Ok(HttpResponse::Ok().json(MessageBody {
            message: ACCEPTED_MESSAGE,
        })),
        SubmitOutcome::Duplicate => Err(WaitlistError::Duplicate),
    }
}

/// Malformed or non-JSON bodies get the same `{ error }` shape as every other failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Rejected request body: {}", err);

    let response = HttpResponse::BadRequest().json(ErrorBody {
        error: INVALID_BODY_ERROR,
    });

    InternalError::from_response(err, response).into()
}

#[derive(thiserror::Error)]
pub enum WaitlistError {
    #[error("{0}")]
    InvalidEmail(String),
    #[error("The email is already on the waitlist.")]
    Duplicate,
    #[error("Failed to add the email to the waitlist.")]
    Unexpected(#[source] StoreError),
}

impl std::fmt::Debug for WaitlistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitlistError::Unexpected(err) => write!(f, "{}\nCaused by:\n\t{:?}", self, err),
            _ => write!(f, "{}", self),
        }
    }
}

impl ResponseError for WaitlistError {
    fn status_code(&self) -> StatusCode {
        match self {
            WaitlistError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            WaitlistError::Duplicate => StatusCode::CONFLICT,
            WaitlistError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Store details stay in the logs; callers only get the short message
    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());

        match self {
            WaitlistError::InvalidEmail(_) => response.json(ErrorBody {
                error: INVALID_EMAIL_ERROR,
            }),
            WaitlistError::Duplicate => response.json(MessageBody {
                message: DUPLICATE_MESSAGE,
            }),
            WaitlistError::Unexpected(_) => response.json(ErrorBody {
                error: INTERNAL_ERROR,
            }),
        }
    }
}
