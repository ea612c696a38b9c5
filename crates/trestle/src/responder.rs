//! Conversion of handler return values into response writes.
//!
//! Handlers return any type implementing [`Responder`]; the value is applied
//! to the request's response writer after the handler completes. `Result`
//! propagates its error arm to the dispatch boundary instead of rendering
//! it, so `?` inside handlers escalates to the 500 path.

use crate::context::Context;
use crate::error::HandleError;
use http::StatusCode;
use serde::Serialize;

/// A type that can be written out as (part of) an HTTP response.
pub trait Responder {
    fn respond(self, ctx: &Context) -> Result<(), HandleError>;
}

/// Handlers that only cause side effects respond with nothing.
impl Responder for () {
    fn respond(self, _ctx: &Context) -> Result<(), HandleError> {
        Ok(())
    }
}

impl Responder for &'static str {
    fn respond(self, ctx: &Context) -> Result<(), HandleError> {
        ctx.write_str(self);
        Ok(())
    }
}

impl Responder for String {
    fn respond(self, ctx: &Context) -> Result<(), HandleError> {
        ctx.write_str(&self);
        Ok(())
    }
}

impl Responder for StatusCode {
    fn respond(self, ctx: &Context) -> Result<(), HandleError> {
        ctx.response().set_status(self);
        Ok(())
    }
}

/// Sets a status code along with the response content.
impl<T: Responder> Responder for (StatusCode, T) {
    fn respond(self, ctx: &Context) -> Result<(), HandleError> {
        let (status, responder) = self;
        ctx.response().set_status(status);
        responder.respond(ctx)
    }
}

/// `None` writes nothing, leaving the response as the handler set it up.
impl<T: Responder> Responder for Option<T> {
    fn respond(self, ctx: &Context) -> Result<(), HandleError> {
        match self {
            Some(responder) => responder.respond(ctx),
            None => Ok(()),
        }
    }
}

/// The error arm escalates to the request's recovery boundary.
impl<T: Responder, E: Into<HandleError>> Responder for Result<T, E> {
    fn respond(self, ctx: &Context) -> Result<(), HandleError> {
        match self {
            Ok(responder) => responder.respond(ctx),
            Err(error) => Err(error.into()),
        }
    }
}

/// Serializes the wrapped value as a JSON response.
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn respond(self, ctx: &Context) -> Result<(), HandleError> {
        ctx.write_json(&self.0)
    }
}
