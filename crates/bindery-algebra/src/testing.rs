//! In-memory [`GraphSource`] for tests and small embedded datasets.

use bindery_core::{Solution, Term};

use crate::pattern::TriplePattern;
use crate::source::GraphSource;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Quad {
    subject: Term,
    predicate: Term,
    object: Term,
    graph: Option<Term>,
}

/// A flat quad list. Matching is a linear scan.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    quads: Vec<Quad>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triple to the default graph.
    pub fn insert(&mut self, subject: Term, predicate: Term, object: Term) -> &mut Self {
        self.insert_quad(subject, predicate, object, None)
    }

    pub fn insert_quad(
        &mut self,
        subject: Term,
        predicate: Term,
        object: Term,
        graph: Option<Term>,
    ) -> &mut Self {
        let quad = Quad {
            subject,
            predicate,
            object,
            graph,
        };
        if !self.quads.contains(&quad) {
            self.quads.push(quad);
        }
        self
    }

    /// Builder form of [`insert`](Self::insert) taking IRIs.
    pub fn with_iris(mut self, subject: &str, predicate: &str, object: &str) -> Self {
        self.insert(Term::iri(subject), Term::iri(predicate), Term::iri(object));
        self
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }
}

impl GraphSource for MemoryGraph {
    fn match_pattern(
        &self,
        pattern: &TriplePattern,
        graph: Option<&Term>,
    ) -> anyhow::Result<Vec<Solution>> {
        Ok(self
            .quads
            .iter()
            .filter(|q| q.graph.as_ref() == graph)
            .filter_map(|q| pattern.match_triple(&q.subject, &q.predicate, &q.object))
            .collect())
    }

    fn graph_names(&self) -> anyhow::Result<Vec<Term>> {
        let mut names: Vec<Term> = Vec::new();
        for name in self.quads.iter().filter_map(|q| q.graph.as_ref()) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Ok(names)
    }
}
