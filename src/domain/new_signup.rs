use actix_web::web;
use serde_json::Value;

use crate::domain::waitlist_email::WaitlistEmail;

#[derive(serde::Deserialize, Debug)]
pub struct NewSignupBody {
    // Missing, null or non-string emails are validation errors, not a malformed body
    #[serde(default)]
    pub email: Option<Value>,
}

#[derive(Debug)]
pub struct NewSignup {
    pub email: WaitlistEmail,
}

impl TryFrom<web::Json<NewSignupBody>> for NewSignup {
    type Error = String;

    fn try_from(body: web::Json<NewSignupBody>) -> Result<Self, Self::Error> {
        let email = match body.into_inner().email {
            Some(Value::String(email)) => email,
            Some(other) => return Err(format!("{} email is not a string", other)),
            None => return Err(String::from("email is missing")),
        };
        let email = WaitlistEmail::parse(email)?;

        Ok(NewSignup { email })
    }
}
