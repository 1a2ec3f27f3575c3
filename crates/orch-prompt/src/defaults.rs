//! Built-in analysis prompt templates
//!
//! These cover the standard analysis operations so a service instance is
//! usable without registering anything. Callers override or extend them
//! through the registry. Every template receives `symbol`, `timeframe`,
//! `observation` (the formatted latest snapshot) and `context` (the
//! token-budgeted window assembly, possibly empty).

use crate::{PromptRegistry, PromptTemplate, Result};

const COMPREHENSIVE: &str = r#"You are a market analyst. Provide a comprehensive analysis of {{ symbol }} on the {{ timeframe }} timeframe.

Latest observation:
{{ observation }}
{% if context %}
Recent market context:
{{ context }}
{% endif %}
Cover trend, momentum, notable risks and an overall assessment. Be concise and specific."#;

const TECHNICAL: &str = r#"You are a technical analyst. Analyze the price action of {{ symbol }} ({{ timeframe }}).

Latest observation:
{{ observation }}
{% if context %}
Context:
{{ context }}
{% endif %}
Focus on support/resistance, momentum and volume confirmation."#;

const SENTIMENT: &str = r#"Assess current market sentiment around {{ symbol }}.

Latest observation:
{{ observation }}
{% if context %}
Context:
{{ context }}
{% endif %}
Classify sentiment as bullish, bearish or neutral and explain the strongest signal."#;

const RISK: &str = r#"Evaluate the downside risk of holding {{ symbol }} over the next {{ timeframe }} period.

Latest observation:
{{ observation }}
{% if context %}
Context:
{{ context }}
{% endif %}
Name the primary risk factors and rate overall risk low, medium or high."#;

/// The built-in templates
pub fn default_templates() -> Result<Vec<PromptTemplate>> {
    Ok(vec![
        PromptTemplate::new("comprehensive", COMPREHENSIVE)?,
        PromptTemplate::new("technical", TECHNICAL)?,
        PromptTemplate::new("sentiment", SENTIMENT)?,
        PromptTemplate::new("risk", RISK)?,
    ])
}

/// Register every built-in template on `registry`
pub fn register_defaults(registry: &PromptRegistry) -> Result<()> {
    for template in default_templates()? {
        registry.register(template);
    }
    Ok(())
}
