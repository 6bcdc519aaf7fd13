//! Documentation search tool backed by the knowledge store.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{ParamKind, Parameter, Tool, ToolArgs};
use crate::knowledge::{DocumentEntry, KnowledgeStore};

const PARAMETERS: &[Parameter] = &[Parameter {
    name: "query",
    kind: ParamKind::String,
    required: true,
    description: "What the user wants to do with the API, in plain words",
}];

/// Search the API documentation by semantic similarity.
pub struct SearchApiTool {
    knowledge: KnowledgeStore,
    top_n: usize,
}

impl SearchApiTool {
    pub fn new(knowledge: KnowledgeStore, top_n: usize) -> Self {
        Self { knowledge, top_n }
    }
}

/// What the model sees of a document. Vectors stay out of the prompt.
#[derive(Serialize)]
struct DocSnippet<'a> {
    name: &'a str,
    description: &'a str,
    data: Option<&'a Map<String, Value>>,
    response: &'a Value,
}

impl<'a> From<&'a DocumentEntry> for DocSnippet<'a> {
    fn from(entry: &'a DocumentEntry) -> Self {
        Self {
            name: &entry.name,
            description: &entry.description,
            data: entry.data.as_ref(),
            response: &entry.response,
        }
    }
}

#[async_trait]
impl Tool for SearchApiTool {
    fn name(&self) -> &str {
        "search_api"
    }

    fn description(&self) -> &str {
        "Search the API documentation. Returns the most relevant endpoints with their parameters and an example response."
    }

    fn parameters(&self) -> &[Parameter] {
        PARAMETERS
    }

    async fn execute(&self, args: ToolArgs) -> anyhow::Result<String> {
        let query = args
            .str("query")
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;

        let docs = self.knowledge.search(query, self.top_n).await?;
        if docs.is_empty() {
            return Ok(format!("No API documentation found for: {}", query));
        }

        let snippets: Vec<DocSnippet<'_>> = docs.iter().map(DocSnippet::from).collect();
        Ok(serde_json::to_string(&snippets)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{InMemoryDocumentStore, NewDocument};
    use crate::testing::TableEmbedder;
    use crate::tools::ToolRegistry;
    use serde_json::json;
    use std::sync::Arc;

    fn knowledge() -> KnowledgeStore {
        let embedder = TableEmbedder::new("test-embed")
            .with("find people", vec![1.0, 0.0])
            .with("Search people by title", vec![0.9, 0.1])
            .with("Enrich a company", vec![0.0, 1.0]);
        KnowledgeStore::new(Arc::new(InMemoryDocumentStore::new()), Arc::new(embedder))
    }

    async fn seed(knowledge: &KnowledgeStore) {
        for (name, description) in [
            ("person_search", "Search people by title"),
            ("company_enrich", "Enrich a company"),
        ] {
            knowledge
                .insert(NewDocument {
                    name: name.to_string(),
                    description: description.to_string(),
                    data: json!({"method": "POST"}).as_object().cloned(),
                    response: json!({"status": 200}),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn returns_top_match_without_vectors() {
        let knowledge = knowledge();
        seed(&knowledge).await;
        let registry = ToolRegistry::for_support(knowledge, 1);

        let output = registry.execute("search_api", r#"{"query":"find people"}"#).await;
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            parsed,
            json!([{
                "name": "person_search",
                "description": "Search people by title",
                "data": {"method": "POST"},
                "response": {"status": 200}
            }])
        );
    }

    #[tokio::test]
    async fn empty_corpus_says_nothing_matched() {
        let registry = ToolRegistry::for_support(knowledge(), 5);
        let output = registry.execute("search_api", r#"{"query":"find people"}"#).await;
        assert_eq!(output, "No API documentation found for: find people");
    }

    #[tokio::test]
    async fn provider_failure_is_a_result_string() {
        let registry = ToolRegistry::for_support(knowledge(), 5);
        let output = registry.execute("search_api", r#"{"query":"unmapped"}"#).await;
        assert!(output.starts_with("Error executing tool 'search_api': Failed to generate vector"));
    }

    #[test]
    fn schema_matches_the_documented_contract() {
        let registry = ToolRegistry::for_support(knowledge(), 5);
        let schema = &registry.get_tool_schemas()[0];
        assert_eq!(schema.name, "search_api");
        assert!(schema.strict);
        assert_eq!(schema.parameters["required"], json!(["query"]));
        assert_eq!(schema.parameters["properties"]["query"]["type"], "string");
        assert_eq!(schema.parameters["additionalProperties"], false);
    }
}
