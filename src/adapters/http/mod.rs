//! HTTP adapters for the request/response API.

mod chat_api;
mod dispatcher;

pub use chat_api::HttpChatApi;
pub use dispatcher::HttpRequestDispatcher;
