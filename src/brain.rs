//! Threshold-neuron networks driving agent behaviour.
//!
//! Neurons are stored in one flat vector: inputs first, then hidden
//! neurons, then outputs. Connections only ever point to a higher index, so
//! a single pass in index order propagates a tick's activity through the
//! whole network. Excitation that does not cause a neuron to fire lingers
//! into the next tick, reduced by the neuron's drain.

use rand::Rng;

pub const INPUTS: usize = 4;
pub const OUTPUTS: usize = 2;

const MAX_CONNECTIONS: usize = 3;
const WEIGHT_RANGE: f32 = 2.0;

// FNV-1a 64-bit
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(hash, |hash, &byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

#[derive(Debug, Clone, PartialEq)]
struct ForwardConn {
    dest_index: usize,
    weight: f32,
    // Scales by the source excitation instead of passing a constant
    relu: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Neuron {
    excitation: f32,
    tick_drain: f32,
    act_threshold: f32,
    next_conn: Vec<ForwardConn>,
}

impl Neuron {
    fn fires(&self) -> bool {
        self.excitation >= self.act_threshold
    }
}

/// Action chosen by a brain for one tick.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Decision {
    pub moving: bool,
    pub turning: bool,
    /// How far the outputs were from their thresholds, squashed into `[0, 1)`.
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Brain {
    neurons: Vec<Neuron>,
    last_decision: Decision,
}

impl Brain {
    /// A fresh random genotype with `hidden` neurons between inputs and outputs.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, hidden: usize) -> Self {
        let total = INPUTS + hidden + OUTPUTS;
        let first_output = total - OUTPUTS;
        let mut neurons = Vec::with_capacity(total);

        for index in 0..total {
            let mut next_conn = Vec::new();
            if index < first_output {
                let lowest = (index + 1).max(INPUTS);
                let count = rng.gen_range(1..=MAX_CONNECTIONS);
                for _ in 0..count {
                    next_conn.push(ForwardConn {
                        dest_index: rng.gen_range(lowest..total),
                        weight: rng.gen_range(-WEIGHT_RANGE..WEIGHT_RANGE),
                        relu: rng.gen_bool(0.5),
                    });
                }
            }
            neurons.push(Neuron {
                excitation: 0.0,
                tick_drain: rng.gen_range(0.1..0.6),
                act_threshold: rng.gen_range(0.2..1.5),
                next_conn,
            });
        }

        Self {
            neurons,
            last_decision: Decision::default(),
        }
    }

    /// Copy of this genotype with perturbed weights and thresholds and no
    /// carried-over excitation.
    pub fn mutated<R: Rng + ?Sized>(&self, rng: &mut R, chance: f64, max_delta: f32) -> Self {
        let total = self.neurons.len();
        let mut neurons = self.neurons.clone();

        for (index, neuron) in neurons.iter_mut().enumerate() {
            neuron.excitation = 0.0;
            if rng.gen_bool(chance) {
                neuron.act_threshold =
                    (neuron.act_threshold + rng.gen_range(-max_delta..max_delta)).max(0.05);
            }
            if rng.gen_bool(chance) {
                neuron.tick_drain = (neuron.tick_drain + rng.gen_range(-0.1..0.1)).clamp(0.0, 1.0);
            }
            let lowest = (index + 1).max(INPUTS);
            for conn in &mut neuron.next_conn {
                if rng.gen_bool(chance) {
                    conn.weight = (conn.weight + rng.gen_range(-max_delta..max_delta))
                        .clamp(-WEIGHT_RANGE * 2.0, WEIGHT_RANGE * 2.0);
                }
                if rng.gen_bool(chance / 4.0) {
                    conn.dest_index = rng.gen_range(lowest..total);
                }
                if rng.gen_bool(chance / 4.0) {
                    conn.relu = !conn.relu;
                }
            }
        }

        Self {
            neurons,
            last_decision: Decision::default(),
        }
    }

    /// Runs one tick of the network for the given sensory inputs.
    pub fn think(&mut self, inputs: [f32; INPUTS]) -> Decision {
        let total = self.neurons.len();
        let first_output = total - OUTPUTS;

        for (neuron, value) in self.neurons.iter_mut().zip(inputs) {
            neuron.excitation = value;
        }
        for neuron in &mut self.neurons[INPUTS..] {
            neuron.excitation *= 1.0 - neuron.tick_drain;
        }

        for index in 0..first_output {
            // Connections point forward, so every target lives in `ahead`
            let (done, ahead) = self.neurons.split_at_mut(index + 1);
            let source = &mut done[index];
            // Input neurons always fire
            if index >= INPUTS && !source.fires() {
                continue;
            }
            for conn in &source.next_conn {
                let signal = if conn.relu {
                    conn.weight * source.excitation.max(0.0)
                } else {
                    conn.weight
                };
                ahead[conn.dest_index - index - 1].excitation += signal;
            }
            if index >= INPUTS {
                source.excitation = 0.0;
            }
        }

        let outputs = &self.neurons[first_output..];
        let margin: f32 = outputs
            .iter()
            .map(|n| (n.excitation - n.act_threshold).abs())
            .sum::<f32>()
            / OUTPUTS as f32;
        let decision = Decision {
            moving: outputs[0].fires(),
            turning: outputs[1].fires(),
            confidence: margin / (margin + 1.0),
        };
        for neuron in &mut self.neurons[first_output..] {
            if neuron.fires() {
                neuron.excitation = 0.0;
            }
        }

        self.last_decision = decision;
        decision
    }

    pub fn last_decision(&self) -> Decision {
        self.last_decision
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn synapse_count(&self) -> usize {
        self.neurons.iter().map(|n| n.next_conn.len()).sum()
    }

    /// Stable fingerprint of the genotype. Runtime excitation is not part of it.
    pub fn signature(&self) -> u64 {
        let mut hash = FNV_OFFSET;
        for neuron in &self.neurons {
            hash = fnv1a(hash, &neuron.act_threshold.to_le_bytes());
            hash = fnv1a(hash, &neuron.tick_drain.to_le_bytes());
            for conn in &neuron.next_conn {
                hash = fnv1a(hash, &(conn.dest_index as u64).to_le_bytes());
                hash = fnv1a(hash, &conn.weight.to_le_bytes());
                hash = fnv1a(hash, &[u8::from(conn.relu)]);
            }
        }
        hash
    }

    pub fn summary(&self) -> String {
        let decision = self.last_decision;
        format!(
            "genotype {:016x}, {} neurons / {} synapses, last decision moving={} turning={} (confidence {:.2})",
            self.signature(),
            self.neuron_count(),
            self.synapse_count(),
            decision.moving,
            decision.turning,
            decision.confidence
        )
    }
}
