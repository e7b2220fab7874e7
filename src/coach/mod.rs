//! Coaching personas, business tools and the non-streaming coach agent.

mod agent;
pub mod catalog;

pub use agent::CoachAgent;
pub use catalog::{find_tool, greeting_for, instruction_for, BusinessTool, Persona, BUSINESS_TOOLS, COACH_PERSONA};
