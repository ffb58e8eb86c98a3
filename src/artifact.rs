use crate::error::SnapshotError;
use crate::graph::FlowGraph;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};

/// A frozen graph saved in a compact binary form, so flows can be compiled
/// later without rerunning the code that built them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GraphSnapshot {
    pub crate_version: String,
    pub graph: FlowGraph,
}

impl GraphSnapshot {
    pub fn new(graph: FlowGraph) -> Self {
        Self {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            graph,
        }
    }

    pub fn into_graph(self) -> FlowGraph {
        self.graph
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        encode_to_vec(self, standard()).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Deserializes a snapshot from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (mut snapshot, _): (Self, usize) =
            decode_from_slice(bytes, standard()).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        snapshot.graph.reindex();
        Ok(snapshot)
    }

    /// Saves the snapshot to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), SnapshotError> {
        let bytes = self.to_bytes()?;
        let io = |source| SnapshotError::Io {
            path: path.to_string(),
            source,
        };
        let mut file = fs::File::create(path).map_err(io)?;
        file.write_all(&bytes).map_err(io)?;
        Ok(())
    }

    /// Loads a snapshot from a file.
    pub fn from_file(path: &str) -> Result<Self, SnapshotError> {
        let io = |source| SnapshotError::Io {
            path: path.to_string(),
            source,
        };
        let mut file = fs::File::open(path).map_err(io)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(io)?;
        Self::from_bytes(&bytes)
    }
}
