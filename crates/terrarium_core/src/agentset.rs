//! Breed membership and agentset descriptions.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use terrarium_data::{AgentKind, LinkId, PatchId, Program, TurtleId};

/// Ordered members of one breed. Iteration follows id order, which is
/// creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreedSet<K: Ord + Copy> {
    name: String,
    singular: String,
    directed: bool,
    members: BTreeSet<K>,
}

impl<K: Ord + Copy> BreedSet<K> {
    #[must_use]
    pub fn new(name: &str, singular: &str, directed: bool) -> Self {
        Self {
            name: name.to_uppercase(),
            singular: singular.to_uppercase(),
            directed,
            members: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn singular(&self) -> &str {
        &self.singular
    }

    #[must_use]
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub(crate) fn set_directed(&mut self, directed: bool) {
        self.directed = directed;
    }

    pub fn insert(&mut self, id: K) -> bool {
        self.members.insert(id)
    }

    pub fn remove(&mut self, id: &K) -> bool {
        self.members.remove(id)
    }

    #[must_use]
    pub fn contains(&self, id: &K) -> bool {
        self.members.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.members.iter().copied()
    }

    pub(crate) fn take_members(&mut self) -> BTreeSet<K> {
        std::mem::take(&mut self.members)
    }

    pub(crate) fn clear(&mut self) {
        self.members.clear();
    }
}

/// Registry of breeds of one agent kind, in declaration order. Index 0 is
/// the universal set (`TURTLES` or `LINKS`) and records only the agents that
/// carry no specific breed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breeds<K: Ord + Copy> {
    sets: Vec<BreedSet<K>>,
}

impl<K: Ord + Copy> Breeds<K> {
    /// Builds the registry for turtle breeds of `program`.
    #[must_use]
    pub fn for_turtles(program: &Program) -> Self {
        let mut sets = vec![BreedSet::new(Program::TURTLES, "TURTLE", false)];
        sets.extend(
            program
                .breeds
                .iter()
                .map(|b| BreedSet::new(&b.name, &b.singular, false)),
        );
        Self { sets }
    }

    #[must_use]
    pub fn for_links(program: &Program) -> Self {
        let mut sets = vec![BreedSet::new(Program::LINKS, "LINK", false)];
        sets.extend(
            program
                .link_breeds
                .iter()
                .map(|b| BreedSet::new(&b.name, &b.singular, b.directed)),
        );
        Self { sets }
    }

    /// Rank of a breed: 0 for the universal set, then declaration order.
    #[must_use]
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.sets.iter().position(|s| s.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BreedSet<K>> {
        self.sets.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BreedSet<K>> {
        self.sets
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn universal(&self) -> &BreedSet<K> {
        &self.sets[0]
    }

    pub(crate) fn universal_mut(&mut self) -> &mut BreedSet<K> {
        &mut self.sets[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BreedSet<K>> {
        self.sets.iter()
    }

    pub(crate) fn enroll(&mut self, breed: &str, id: K) {
        if let Some(set) = self.sets.iter_mut().find(|s| s.name == breed) {
            set.insert(id);
        }
    }

    pub(crate) fn withdraw(&mut self, breed: &str, id: K) {
        if let Some(set) = self.sets.iter_mut().find(|s| s.name == breed) {
            set.remove(&id);
        }
    }

    pub(crate) fn clear_members(&mut self) {
        for set in self.sets.iter_mut() {
            set.clear();
        }
    }

    /// Carries members of breeds that survive into `next`, a registry built
    /// from a newer program.
    pub(crate) fn carry_into(mut self, next: &mut Breeds<K>) {
        for set in self.sets.iter_mut() {
            if let Some(target) = next.sets.iter_mut().find(|s| s.name == set.name) {
                target.members = set.take_members();
                if target.name == Program::LINKS {
                    target.directed = set.directed;
                }
            }
        }
    }
}

/// A set of agents to query or iterate over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentSet {
    AllTurtles,
    AllPatches,
    AllLinks,
    TurtleBreed(String),
    LinkBreed(String),
    Turtles(Vec<TurtleId>),
    Patches(Vec<PatchId>),
    Links(Vec<LinkId>),
}

impl AgentSet {
    #[must_use]
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentSet::AllTurtles | AgentSet::TurtleBreed(_) | AgentSet::Turtles(_) => {
                AgentKind::Turtle
            }
            AgentSet::AllPatches | AgentSet::Patches(_) => AgentKind::Patch,
            AgentSet::AllLinks | AgentSet::LinkBreed(_) | AgentSet::Links(_) => AgentKind::Link,
        }
    }
}

/// Seeded generator used by the runner and tests for reproducible order.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Returns `items` in a random order drawn from `rng`.
#[must_use]
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}
