//! External collaborator clients: chat platform and ticketing.

pub mod jira;
pub mod slack;
