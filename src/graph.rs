//! Co-authorship network derivation.
//!
//! The network is recomputed from stored metadata on every request; nothing
//! about it is persisted. Authors are identified by display name only, so two
//! people sharing a name collapse into one node. That is a known
//! approximation carried over from the data source, not an identity claim.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::metadata::MetadataStore;
use crate::types::RagError;

/// One author in the network. `id` and `name` are both the display name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthorNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Article that contributed a co-authorship edge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkArticle {
    pub id: String,
    pub title: String,
}

/// Undirected link between two co-authors, endpoints sorted
/// lexicographically so the pair key is canonical.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoauthorLink {
    pub source: String,
    pub target: String,
    pub articles: Vec<LinkArticle>,
}

/// Graph response shape. Node and link order is map iteration order and
/// therefore unspecified; callers needing stable order must sort.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthorNetwork {
    pub nodes: Vec<AuthorNode>,
    pub links: Vec<CoauthorLink>,
}

/// Builds the co-authorship network from stored articles, optionally
/// restricted to the given identifiers.
pub async fn build_graph(
    store: &dyn MetadataStore,
    article_ids: Option<&[String]>,
) -> Result<AuthorNetwork, RagError> {
    let articles = store.list_projections(article_ids).await?;

    let mut nodes: HashMap<String, AuthorNode> = HashMap::new();
    let mut links: HashMap<(String, String), CoauthorLink> = HashMap::new();

    for article in &articles {
        for name in &article.authors {
            nodes.entry(name.clone()).or_insert_with(|| AuthorNode {
                id: name.clone(),
                name: name.clone(),
                kind: "author".to_string(),
            });
        }

        // Sort and dedup before pairing: the pair key must not depend on
        // byline order, and a repeated name must not link to itself.
        let mut authors = article.authors.clone();
        authors.sort_unstable();
        authors.dedup();
        if authors.len() < 2 {
            continue;
        }

        for (i, first) in authors.iter().enumerate() {
            for second in &authors[i + 1..] {
                let link = links
                    .entry((first.clone(), second.clone()))
                    .or_insert_with(|| CoauthorLink {
                        source: first.clone(),
                        target: second.clone(),
                        articles: Vec::new(),
                    });
                link.articles.push(LinkArticle {
                    id: article.id.clone(),
                    title: article.title.clone(),
                });
            }
        }
    }

    let network = AuthorNetwork {
        nodes: nodes.into_values().collect(),
        links: links.into_values().collect(),
    };
    info!(
        articles = articles.len(),
        nodes = network.nodes.len(),
        links = network.links.len(),
        "built co-authorship network"
    );
    Ok(network)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::metadata::{Article, ArticleProjection, InsertOutcome};

    /// Fixed-projection store; only the graph read path matters here.
    struct StaticStore {
        projections: Vec<ArticleProjection>,
    }

    #[async_trait]
    impl MetadataStore for StaticStore {
        async fn insert(&self, _article: &Article) -> Result<InsertOutcome, RagError> {
            unimplemented!("not used by graph tests")
        }

        async fn count(&self) -> Result<usize, RagError> {
            Ok(self.projections.len())
        }

        async fn list_all(&self) -> Result<Vec<Article>, RagError> {
            unimplemented!("not used by graph tests")
        }

        async fn list_projections(
            &self,
            ids: Option<&[String]>,
        ) -> Result<Vec<ArticleProjection>, RagError> {
            Ok(match ids {
                None => self.projections.clone(),
                Some(ids) => self
                    .projections
                    .iter()
                    .filter(|p| ids.contains(&p.id))
                    .cloned()
                    .collect(),
            })
        }

        async fn clear(&self) -> Result<usize, RagError> {
            Ok(0)
        }
    }

    fn projection(id: &str, authors: &[&str]) -> ArticleProjection {
        ArticleProjection {
            id: id.to_string(),
            title: format!("Title {id}"),
            authors: authors.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn link_key(link: &CoauthorLink) -> (String, String) {
        (link.source.clone(), link.target.clone())
    }

    #[tokio::test]
    async fn pairs_are_canonical_regardless_of_byline_order() {
        let store = StaticStore {
            projections: vec![projection("P1", &["Charlie", "Alice", "Bob"])],
        };

        let network = build_graph(&store, None).await.unwrap();
        assert_eq!(network.nodes.len(), 3);

        let mut keys: Vec<_> = network.links.iter().map(link_key).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ("Alice".to_string(), "Bob".to_string()),
                ("Alice".to_string(), "Charlie".to_string()),
                ("Bob".to_string(), "Charlie".to_string()),
            ]
        );
        for link in &network.links {
            assert_eq!(link.articles.len(), 1);
            assert_eq!(link.articles[0].id, "P1");
        }
    }

    #[tokio::test]
    async fn single_author_articles_contribute_no_links() {
        let store = StaticStore {
            projections: vec![projection("P1", &["Solo Author"])],
        };

        let network = build_graph(&store, None).await.unwrap();
        assert_eq!(network.nodes.len(), 1);
        assert!(network.links.is_empty());
    }

    #[tokio::test]
    async fn repeated_name_never_links_to_itself() {
        let store = StaticStore {
            projections: vec![projection("P1", &["Same Name", "Same Name", "Other"])],
        };

        let network = build_graph(&store, None).await.unwrap();
        assert_eq!(network.nodes.len(), 2);
        assert_eq!(network.links.len(), 1);
        assert_eq!(network.links[0].source, "Other");
        assert_eq!(network.links[0].target, "Same Name");
    }

    #[tokio::test]
    async fn same_pair_across_articles_collapses_to_one_link() {
        let store = StaticStore {
            projections: vec![
                projection("P1", &["Alice", "Bob"]),
                projection("P2", &["Bob", "Alice"]),
            ],
        };

        let network = build_graph(&store, None).await.unwrap();
        assert_eq!(network.links.len(), 1);
        let link = &network.links[0];
        assert_eq!((link.source.as_str(), link.target.as_str()), ("Alice", "Bob"));
        let mut contributing: Vec<_> = link.articles.iter().map(|a| a.id.as_str()).collect();
        contributing.sort_unstable();
        assert_eq!(contributing, vec!["P1", "P2"]);
    }

    #[tokio::test]
    async fn id_filter_restricts_the_graph() {
        let store = StaticStore {
            projections: vec![
                projection("P1", &["X", "Y"]),
                projection("P2", &["Y", "Z"]),
            ],
        };

        let filter = vec!["P2".to_string()];
        let network = build_graph(&store, Some(&filter)).await.unwrap();
        assert_eq!(network.nodes.len(), 2);
        assert_eq!(network.links.len(), 1);
        assert_eq!(network.links[0].articles[0].id, "P2");
    }

    #[tokio::test]
    async fn many_author_article_produces_all_pairs() {
        let names: Vec<String> = (0..20).map(|i| format!("Author {i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let store = StaticStore {
            projections: vec![projection("P1", &refs)],
        };

        let network = build_graph(&store, None).await.unwrap();
        assert_eq!(network.nodes.len(), 20);
        assert_eq!(network.links.len(), 20 * 19 / 2);
    }
}
