//! Ticket domain module.
//!
//! - `model`: tickets, drafts, issue reports, ticket types, priority and SLA
//! - `repository`: ticket store collaborator traits

mod model;
mod repository;

pub use model::{
    Category, ImpactScope, IssueReport, Priority, Sla, TicketDraft, TicketRecord, TicketState, TicketType,
};
pub use repository::{TicketCreateService, TicketQuery, TicketQueryService};
