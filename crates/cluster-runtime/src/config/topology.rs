use core::ops::Range;

/// Shape of the simulated machine.
///
/// Every cluster has `compute_cores` compute cores plus one data-movement core, whose core index
/// is `compute_cores`. Clusters are grouped in quads of `clusters_per_quad`; the first cluster of
/// each quad leads broadcasts for the whole quad.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Topology {
    /// Number of clusters.
    #[serde(default = "default_clusters")]
    pub clusters: usize,
    /// Number of compute cores per cluster.
    #[serde(default = "default_compute_cores")]
    pub compute_cores: usize,
    /// Number of clusters per locality group.
    #[serde(default = "default_clusters_per_quad")]
    pub clusters_per_quad: usize,
    /// Size of each cluster's local memory in bytes.
    #[serde(default = "default_tcdm_size")]
    pub tcdm_size: usize,
    /// Size of the shared memory in bytes.
    #[serde(default = "default_shared_memory_size")]
    pub shared_memory_size: usize,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            clusters: default_clusters(),
            compute_cores: default_compute_cores(),
            clusters_per_quad: default_clusters_per_quad(),
            tcdm_size: default_tcdm_size(),
            shared_memory_size: default_shared_memory_size(),
        }
    }
}

impl Topology {
    /// Topology with the given number of clusters and compute cores, other fields defaulted.
    pub fn new(clusters: usize, compute_cores: usize) -> Self {
        Self {
            clusters,
            compute_cores,
            ..Default::default()
        }
    }

    /// Sets the number of clusters per quad.
    pub fn with_clusters_per_quad(mut self, clusters_per_quad: usize) -> Self {
        self.clusters_per_quad = clusters_per_quad;
        self
    }

    /// Sets the local memory size of each cluster.
    pub fn with_tcdm_size(mut self, tcdm_size: usize) -> Self {
        self.tcdm_size = tcdm_size;
        self
    }

    /// Sets the shared memory size.
    pub fn with_shared_memory_size(mut self, shared_memory_size: usize) -> Self {
        self.shared_memory_size = shared_memory_size;
        self
    }

    /// Core index of the data-movement core in every cluster.
    pub fn dm_core_idx(&self) -> usize {
        self.compute_cores
    }

    /// Compute cores plus the data-movement core.
    pub fn cores_per_cluster(&self) -> usize {
        self.compute_cores + 1
    }

    /// Number of cores in the whole system.
    pub fn total_cores(&self) -> usize {
        self.clusters * self.cores_per_cluster()
    }

    /// First cluster of the quad containing `cluster`.
    pub fn quad_leader(&self, cluster: usize) -> usize {
        cluster - cluster % self.clusters_per_quad
    }

    /// Clusters of the quad containing `cluster`, leader excluded.
    pub fn quad_peers(&self, cluster: usize) -> Range<usize> {
        let leader = self.quad_leader(cluster);
        leader + 1..usize::min(leader + self.clusters_per_quad, self.clusters)
    }
}

fn default_clusters() -> usize {
    1
}

fn default_compute_cores() -> usize {
    8
}

fn default_clusters_per_quad() -> usize {
    4
}

fn default_tcdm_size() -> usize {
    128 * 1024
}

fn default_shared_memory_size() -> usize {
    64 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quads_split_clusters_in_groups() {
        let topology = Topology::new(6, 8).with_clusters_per_quad(4);

        assert_eq!(topology.quad_leader(3), 0);
        assert_eq!(topology.quad_leader(5), 4);
        assert_eq!(topology.quad_peers(0), 1..4);
        assert_eq!(topology.quad_peers(4), 5..6);
    }

    #[test]
    fn dm_core_follows_compute_cores() {
        let topology = Topology::new(2, 4);

        assert_eq!(topology.dm_core_idx(), 4);
        assert_eq!(topology.cores_per_cluster(), 5);
        assert_eq!(topology.total_cores(), 10);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let topology: Topology = toml::from_str("clusters = 4").unwrap();

        assert_eq!(topology, Topology::new(4, 8));
    }
}
