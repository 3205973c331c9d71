//! Built-in tools that need no bridge-side configuration: `web_search` and
//! `web_crawl`.

use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{json, Value};

use crate::config::types::ToolSpec;
use crate::error::GatewayError;

pub fn web_search_tool_spec() -> ToolSpec {
    ToolSpec {
        name: "web_search".to_string(),
        description: "Search the web and return a list of matching results".to_string(),
        properties: json!({"query": {"type": "string"}}),
        required: vec!["query".to_string()],
        r#type: "function".to_string(),
    }
}

pub fn web_crawl_tool_spec() -> ToolSpec {
    ToolSpec {
        name: "web_crawl".to_string(),
        description: "Fetch a URL and return its visible text content".to_string(),
        properties: json!({"url": {"type": "string"}}),
        required: vec!["url".to_string()],
        r#type: "function".to_string(),
    }
}

/// Fetches a search-engine results page and extracts result titles/links.
/// Deliberately minimal — the prebuilt-prompt catalog and richer ranking
/// are out of scope.
pub async fn web_search(client: &Client, args: &Value) -> Result<String, GatewayError> {
    let query = args
        .get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Tool("missing query".to_string()))?;

    let url = format!("https://html.duckduckgo.com/html/?q={}", urlencoding::encode(query));
    let body = client
        .get(&url)
        .send()
        .await
        .map_err(|e| GatewayError::Tool(format!("web_search request failed: {e}")))?
        .text()
        .await
        .map_err(|e| GatewayError::Tool(format!("web_search read failed: {e}")))?;

    let document = Html::parse_document(&body);
    let selector = Selector::parse("a.result__a").map_err(|e| GatewayError::Tool(format!("{e:?}")))?;

    let results: Vec<Value> = document
        .select(&selector)
        .take(5)
        .map(|el| {
            json!({
                "title": el.text().collect::<String>(),
                "url": el.value().attr("href").unwrap_or_default(),
            })
        })
        .collect();

    Ok(serde_json::to_string(&results)?)
}

/// Fetches `args.url` and strips it down to visible text.
pub async fn web_crawl(client: &Client, args: &Value) -> Result<String, GatewayError> {
    let url = args
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::Tool("missing url".to_string()))?;

    let body = client
        .get(url)
        .send()
        .await
        .map_err(|e| GatewayError::Tool(format!("web_crawl request failed: {e}")))?
        .text()
        .await
        .map_err(|e| GatewayError::Tool(format!("web_crawl read failed: {e}")))?;

    let document = Html::parse_document(&body);
    let selector = Selector::parse("body").map_err(|e| GatewayError::Tool(format!("{e:?}")))?;
    let text = document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_search_tool_spec_requires_query() {
        let spec = web_search_tool_spec();
        assert_eq!(spec.required, vec!["query".to_string()]);
    }

    #[test]
    fn web_crawl_strips_html_to_whitespace_joined_text() {
        let document = Html::parse_document("<html><body><p>Hello</p>  <p>World</p></body></html>");
        let selector = Selector::parse("body").unwrap();
        let text = document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(cleaned, "Hello World");
    }
}
