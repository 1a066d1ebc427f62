//! Lookup tools for Scout.
//!
//! Two adapters give the agent access to the outside world: a DuckDuckGo
//! web search and a weatherstack current-conditions lookup. Both turn
//! lookup failures into plain-text fallback results so the model can
//! decide what to do next.

pub mod weather_lookup;
pub mod web_search;

use scout_config::{AppConfig, WEATHER_TOOL, WEB_SEARCH_TOOL};
use scout_core::Error;
use scout_core::tool::ToolRegistry;
use tracing::debug;

pub use weather_lookup::WeatherLookupTool;
pub use web_search::WebSearchTool;

/// Build the fixed tool registry for a run.
///
/// Only the tools listed in `agent.tools` are registered. A configured
/// name that no adapter answers to is a configuration error.
pub fn build_registry(config: &AppConfig) -> scout_core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    for name in &config.agent.tools {
        match name.as_str() {
            WEB_SEARCH_TOOL => {
                registry.register(Box::new(WebSearchTool::from_config(&config.search)));
            }
            WEATHER_TOOL => {
                registry.register(Box::new(WeatherLookupTool::from_config(&config.weather)));
            }
            _ => {}
        }
    }

    registry.ensure_registered(&config.agent.tools)?;

    if registry.is_empty() {
        return Err(Error::config("agent.tools is empty; enable at least one tool"));
    }

    debug!(tools = ?registry.names(), "Tool registry ready");
    Ok(registry)
}
