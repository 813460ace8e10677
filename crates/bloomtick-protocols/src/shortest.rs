//! Path enumeration over weighted links.
//!
//! Every link is a path, and a link followed by a path is a path. All
//! paths are kept; [`ShortestPath::best`] picks the cheapest.
//!
//! The derivation only terminates on acyclic link graphs: a cycle yields
//! paths of ever-growing cost. Run such graphs with a bounded
//! [`ProgramConfig`](bloomtick_runtime::ProgramConfig).

use bloomtick_lattice::LSet;
use bloomtick_runtime::{Program, Rel, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub from: String,
    pub to: String,
    pub cost: i64,
}

impl Link {
    pub fn new(from: impl Into<String>, to: impl Into<String>, cost: i64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            cost,
        }
    }
}

/// A route from `from` to `to` whose first hop ends at `next`. Direct
/// links have an empty `next`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path {
    pub from: String,
    pub to: String,
    pub next: String,
    pub cost: i64,
}

impl Path {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        next: impl Into<String>,
        cost: i64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            next: next.into(),
            cost,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ShortestPath {
    pub links: Rel<LSet<Link>>,
    pub paths: Rel<LSet<Path>>,
}

impl ShortestPath {
    /// The cheapest known path between two nodes.
    pub fn best(&self, program: &Program, from: &str, to: &str) -> Option<Path> {
        program
            .get(self.paths)
            .iter()
            .filter(|path| path.from == from && path.to == to)
            .min_by_key(|path| path.cost)
            .cloned()
    }
}

/// Declare link and path relations under `prefix`.
pub fn shortest_path(program: &mut Program, prefix: &str) -> Result<ShortestPath> {
    let links = program.declare_set::<Link>(format!("{prefix}ShortestPathLink"))?;
    let links = program.mark_input(links)?;
    let paths = program.declare_set::<Path>(format!("{prefix}ShortestPath"))?;
    let paths = program.mark_output(paths)?;

    program
        .join(links)
        .select(|_, link: Link| Some(Path::new(link.from, link.to, "", link.cost)))
        .into(paths)?;
    program
        .join((links, paths))
        .select(|_, (link, path): (Link, Path)| {
            (link.to == path.from).then(|| Path {
                from: link.from,
                to: path.to,
                next: link.to,
                cost: link.cost + path.cost,
            })
        })
        .into(paths)?;

    Ok(ShortestPath { links, paths })
}
