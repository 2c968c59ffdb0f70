//! Proximity ranking of gateways.
//!
//! Gateways that project to the same ECEF point form a [`GatewayGroup`]. The
//! spatial index holds one entry per group, so a query ranks *locations*; the
//! ranker then expands each location into its hosts.
//!
//! Order guarantees for [`GatewayRanker::rank`]:
//!
//! - groups appear strictly by distance to the query point, identically on
//!   every call with the same query;
//! - hosts inside a group are shuffled per call with a freshly seeded RNG, so
//!   no co-located host is systematically preferred;
//! - denylisted and already-emitted hosts are skipped.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::directory::{Gateway, GatewayDirectory};
use crate::geodesy::{project, Coordinates, SpatialPoint};
use crate::spatial::SpatialIndex;

/// Host identifiers excluded from every ranking. Fixed at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Denylist {
    hosts: HashSet<String>,
}

impl Denylist {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(Into::into)
                .filter(|h: &String| !h.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated host list. Blank entries are ignored.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim))
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Hosts in sorted order, for logging.
    pub fn sorted(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.hosts.iter().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }
}

impl FromStr for Denylist {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Gateways sharing one projected point.
#[derive(Debug, Clone)]
pub struct GatewayGroup {
    pub point: SpatialPoint,
    pub members: Vec<Gateway>,
}

/// Immutable ranking snapshot: spatial index plus the group behind each entry.
#[derive(Debug, Clone)]
pub struct GatewayRanker {
    index: SpatialIndex,
    groups: Vec<GatewayGroup>,
    gateway_count: usize,
}

impl GatewayRanker {
    /// Group gateways by projected point and build the index over the groups.
    pub fn from_directory(directory: &GatewayDirectory) -> Self {
        Self::from_gateways(directory.gateways())
    }

    pub fn from_gateways(gateways: &[Gateway]) -> Self {
        let mut slots: HashMap<[u64; 3], usize> = HashMap::new();
        let mut groups: Vec<GatewayGroup> = Vec::new();

        for gateway in gateways {
            let point = project(gateway.coordinates);
            let slot = *slots.entry(point.key()).or_insert_with(|| {
                groups.push(GatewayGroup {
                    point,
                    members: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].members.push(gateway.clone());
        }

        let points: Vec<SpatialPoint> = groups.iter().map(|g| g.point).collect();
        let index = SpatialIndex::build(&points);

        info!(
            gateways = gateways.len(),
            locations = groups.len(),
            "built gateway ranking index"
        );

        Self {
            index,
            groups,
            gateway_count: gateways.len(),
        }
    }

    /// Total number of gateways across all groups.
    pub fn gateway_count(&self) -> usize {
        self.gateway_count
    }

    /// Number of distinct gateway locations.
    pub fn location_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> &[GatewayGroup] {
        &self.groups
    }

    /// Rank hosts by distance to `query`, shuffling co-located hosts with an
    /// RNG seeded for this call only.
    pub fn rank(&self, query: &SpatialPoint, denylist: &Denylist) -> Vec<String> {
        let mut rng = StdRng::from_entropy();
        self.rank_with_rng(query, denylist, &mut rng)
    }

    /// Project `coordinates` and rank.
    pub fn rank_coordinates(&self, coordinates: Coordinates, denylist: &Denylist) -> Vec<String> {
        self.rank(&project(coordinates), denylist)
    }

    /// Rank using the caller's RNG for the intra-group shuffle.
    pub fn rank_with_rng<R: Rng + ?Sized>(
        &self,
        query: &SpatialPoint,
        denylist: &Denylist,
        rng: &mut R,
    ) -> Vec<String> {
        let mut ranked = Vec::with_capacity(self.gateway_count);
        let mut emitted: HashSet<&str> = HashSet::with_capacity(self.gateway_count);

        for neighbour in self.index.k_nearest(query, self.groups.len()) {
            let group = &self.groups[neighbour.item];

            let mut members: Vec<&Gateway> = group.members.iter().collect();
            if members.len() > 1 {
                members.shuffle(rng);
            }

            for gateway in members {
                let host = gateway.host.as_str();
                if denylist.contains(host) || !emitted.insert(host) {
                    continue;
                }
                ranked.push(gateway.host.clone());
            }
        }

        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gw(host: &str, lat: f64, lon: f64) -> Gateway {
        Gateway::new(host, "test", "127.0.0.1", Coordinates::new(lat, lon))
    }

    #[test]
    fn denylist_parse_trims_and_skips_blanks() {
        let denylist = Denylist::parse(" a.example.org, ,b.example.org,");
        assert_eq!(denylist.len(), 2);
        assert!(denylist.contains("a.example.org"));
        assert!(denylist.contains("b.example.org"));
        assert!(!denylist.contains(""));
    }

    #[test]
    fn empty_denylist_string_is_empty() {
        assert!(Denylist::parse("").is_empty());
        assert!("".parse::<Denylist>().unwrap().is_empty());
    }

    #[test]
    fn colocated_gateways_share_a_group() {
        let ranker = GatewayRanker::from_gateways(&[
            gw("a", 10.0, 10.0),
            gw("b", 10.0, 10.0),
            gw("c", -10.0, 40.0),
        ]);
        assert_eq!(ranker.gateway_count(), 3);
        assert_eq!(ranker.location_count(), 2);
        assert_eq!(ranker.groups()[0].members.len(), 2);
    }

    #[test]
    fn signed_zero_longitude_shares_a_group() {
        let ranker = GatewayRanker::from_gateways(&[gw("east", 0.0, 0.0), gw("west", 0.0, -0.0)]);
        assert_eq!(ranker.location_count(), 1);
        assert_eq!(ranker.groups()[0].members.len(), 2);
    }

    #[test]
    fn empty_directory_ranks_nothing() {
        let ranker = GatewayRanker::from_gateways(&[]);
        let ranked = ranker.rank_coordinates(Coordinates::new(0.0, 0.0), &Denylist::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn single_gateway_ranks_alone() {
        let ranker = GatewayRanker::from_gateways(&[gw("only", 1.0, 2.0)]);
        let ranked = ranker.rank_coordinates(Coordinates::new(50.0, 50.0), &Denylist::default());
        assert_eq!(ranked, vec!["only".to_string()]);
    }

    #[test]
    fn duplicate_hosts_are_emitted_once() {
        let ranker = GatewayRanker::from_gateways(&[
            gw("dup", 10.0, 10.0),
            gw("dup", 20.0, 20.0),
            gw("other", 30.0, 30.0),
        ]);
        let ranked = ranker.rank_coordinates(Coordinates::new(10.0, 10.0), &Denylist::default());
        assert_eq!(ranked, vec!["dup".to_string(), "other".to_string()]);
    }

    #[test]
    fn fixed_rng_gives_reproducible_shuffle() {
        let ranker = GatewayRanker::from_gateways(&[
            gw("a", 0.0, 0.0),
            gw("b", 0.0, 0.0),
            gw("c", 0.0, 0.0),
            gw("d", 0.0, 0.0),
        ]);
        let query = project(Coordinates::new(1.0, 1.0));
        let denylist = Denylist::default();
        let first = ranker.rank_with_rng(&query, &denylist, &mut StdRng::seed_from_u64(9));
        let second = ranker.rank_with_rng(&query, &denylist, &mut StdRng::seed_from_u64(9));
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }
}
