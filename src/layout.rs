use std::collections::HashMap;

use tracing::trace;

use crate::{Graph, LayoutConfig, NoteId};

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Force-directed layout state for a [`Graph`].
///
/// Particles live in an arena owned by the simulation and are addressed by
/// note id; the graph itself is only read.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: LayoutConfig,
    ids: Vec<NoteId>,
    slots: HashMap<NoteId, usize>,
    particles: Vec<Particle>,
    springs: Vec<(usize, usize)>,
}

impl Simulation {
    pub fn new(graph: &Graph, config: LayoutConfig) -> Self {
        let mut sim = Self {
            config,
            ids: Vec::new(),
            slots: HashMap::new(),
            particles: Vec::new(),
            springs: Vec::new(),
        };
        sim.sync(graph);
        sim
    }

    /// Rebinds the simulation to a new graph. Surviving nodes keep their
    /// particle state, new nodes are seeded, vanished nodes are dropped.
    pub fn sync(&mut self, graph: &Graph) {
        let total = graph.nodes.len();
        let mut ids = Vec::with_capacity(total);
        let mut slots = HashMap::with_capacity(total);
        let mut particles = Vec::with_capacity(total);

        for (ix, node) in graph.nodes.iter().enumerate() {
            if slots.contains_key(&node.id) {
                continue;
            }
            let particle = match self.slots.get(&node.id) {
                Some(&old) => self.particles[old],
                None => Particle {
                    position: self.seed_position(ix, total),
                    velocity: Vec2::ZERO,
                },
            };
            slots.insert(node.id.clone(), ids.len());
            ids.push(node.id.clone());
            particles.push(particle);
        }

        let springs = graph
            .edges
            .iter()
            .filter_map(|e| Some((*slots.get(&e.a)?, *slots.get(&e.b)?)))
            .collect();

        self.ids = ids;
        self.slots = slots;
        self.particles = particles;
        self.springs = springs;
    }

    fn seed_position(&self, ix: usize, total: usize) -> Vec2 {
        let radius = self.config.spring_length * (total.max(1) as f32).sqrt();
        let angle = ix as f32 * std::f32::consts::TAU / total.max(1) as f32;
        Vec2 {
            x: radius * angle.cos(),
            y: radius * angle.sin(),
        }
    }

    /// Advances one tick and returns the total kinetic energy afterwards.
    pub fn step(&mut self) -> f32 {
        let n = self.particles.len();
        let mut forces = vec![Vec2::ZERO; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let mut delta = self.particles[i].position - self.particles[j].position;
                let mut dist = delta.length();
                if dist < 0.01 {
                    // Coincident particles: separate along a fixed direction.
                    delta = Vec2 {
                        x: 1.0 + i as f32 * 0.01,
                        y: 1.0 + j as f32 * 0.01,
                    };
                    dist = delta.length();
                }
                let push = delta * (self.config.repulsion / (dist * dist * dist));
                forces[i] = forces[i] + push;
                forces[j] = forces[j] - push;
            }
        }

        for &(a, b) in &self.springs {
            let delta = self.particles[b].position - self.particles[a].position;
            let dist = delta.length().max(0.01);
            let stretch = dist - self.config.spring_length;
            let pull = delta * (self.config.spring_strength * stretch / dist);
            forces[a] = forces[a] + pull;
            forces[b] = forces[b] - pull;
        }

        let mut energy = 0.0;
        for (p, f) in self.particles.iter_mut().zip(forces) {
            let centering = p.position * -self.config.centering;
            p.velocity = (p.velocity + f + centering) * self.config.damping;
            p.position = p.position + p.velocity;
            energy += p.velocity.x * p.velocity.x + p.velocity.y * p.velocity.y;
        }
        trace!(particles = n, energy, "layout step");
        energy
    }

    /// Runs up to `steps` ticks, stopping early once the layout settles.
    pub fn run(&mut self, steps: usize) -> usize {
        for i in 0..steps {
            if self.step() < 1e-4 {
                return i + 1;
            }
        }
        steps
    }

    pub fn position(&self, id: &NoteId) -> Option<Vec2> {
        self.slots.get(id).map(|&ix| self.particles[ix].position)
    }

    pub fn particle(&self, id: &NoteId) -> Option<&Particle> {
        self.slots.get(id).map(|&ix| &self.particles[ix])
    }

    /// Moves a particle, e.g. while it is being dragged, and zeroes its velocity.
    pub fn pin(&mut self, id: &NoteId, position: Vec2) -> bool {
        let Some(&ix) = self.slots.get(id) else {
            return false;
        };
        self.particles[ix] = Particle {
            position,
            velocity: Vec2::ZERO,
        };
        true
    }

    pub fn positions(&self) -> impl Iterator<Item = (&NoteId, Vec2)> {
        self.ids
            .iter()
            .zip(self.particles.iter().map(|p| p.position))
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GraphEdge, GraphNode};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
        Graph {
            nodes: ids
                .iter()
                .map(|id| GraphNode {
                    id: (*id).into(),
                    title: id.to_uppercase(),
                    link_count: 0,
                })
                .collect(),
            edges: edges
                .iter()
                .filter_map(|(a, b)| GraphEdge::undirected((*a).into(), (*b).into()))
                .collect(),
        }
    }

    fn dist(sim: &Simulation, a: &str, b: &str) -> f32 {
        let pa = sim.position(&a.into()).unwrap();
        let pb = sim.position(&b.into()).unwrap();
        (pa - pb).length()
    }

    #[test]
    fn seeding_is_deterministic() {
        let g = graph(&["a", "b", "c"], &[("a", "b")]);
        let s1 = Simulation::new(&g, LayoutConfig::default());
        let s2 = Simulation::new(&g, LayoutConfig::default());
        let p1: Vec<_> = s1.positions().map(|(_, p)| p).collect();
        let p2: Vec<_> = s2.positions().map(|(_, p)| p).collect();
        assert_eq!(p1, p2);
    }

    #[test]
    fn connected_nodes_end_closer_than_unconnected() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("c", "d")]);
        let mut sim = Simulation::new(&g, LayoutConfig::default());
        sim.run(300);
        assert!(dist(&sim, "a", "b") < dist(&sim, "a", "c"));
        assert!(sim.positions().all(|(_, p)| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn sync_keeps_survivors_and_drops_vanished() {
        let g1 = graph(&["a", "b"], &[("a", "b")]);
        let mut sim = Simulation::new(&g1, LayoutConfig::default());
        sim.run(10);
        let a_before = sim.position(&"a".into()).unwrap();

        let g2 = graph(&["a", "c"], &[("a", "c")]);
        sim.sync(&g2);
        assert_eq!(sim.len(), 2);
        assert_eq!(sim.position(&"a".into()), Some(a_before));
        assert!(sim.position(&"b".into()).is_none());
        assert!(sim.position(&"c".into()).is_some());
    }

    #[test]
    fn pin_moves_only_known_particles() {
        let g = graph(&["a"], &[]);
        let mut sim = Simulation::new(&g, LayoutConfig::default());
        assert!(sim.pin(&"a".into(), Vec2 { x: 5.0, y: 5.0 }));
        assert!(!sim.pin(&"zz".into(), Vec2::ZERO));
        assert_eq!(sim.position(&"a".into()), Some(Vec2 { x: 5.0, y: 5.0 }));
    }
}
