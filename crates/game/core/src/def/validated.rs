//! Branded, validated definition with interned lookup arenas.

use std::collections::BTreeMap;

use crate::state::{PlayerId, ZoneId};

use super::{
    ActionDef, GameDef, LatticeDef, MetricDef, TableDef, TokenTypeDef, TriggerDef, VarDef,
    VarScope, VictoryDef, ZoneDef,
};

/// A [`GameDef`] that passed structural validation.
///
/// There is no public constructor: the only way to obtain one is
/// [`crate::validate`]. Zone adjacency is interned once into a flat arena of
/// `ZoneId` edges; every name lookup the runtime needs is precomputed here.
#[derive(Clone, Debug)]
pub struct ValidatedDef {
    def: GameDef,
    zones: BTreeMap<String, ZoneId>,
    /// `adjacency[offsets[z]..offsets[z + 1]]` are the neighbours of zone `z`.
    offsets: Vec<usize>,
    adjacency: Vec<ZoneId>,
    seats: BTreeMap<String, PlayerId>,
    actions: BTreeMap<String, usize>,
    lattices: BTreeMap<String, usize>,
    tables: BTreeMap<String, usize>,
    metrics: BTreeMap<String, usize>,
    token_types: BTreeMap<String, usize>,
}

impl ValidatedDef {
    /// Interns lookups. Callers must have checked every reference first.
    pub(crate) fn intern(def: GameDef) -> Self {
        let zones: BTreeMap<String, ZoneId> = def
            .zones
            .iter()
            .enumerate()
            .map(|(i, z)| (z.id.clone(), ZoneId(i as u32)))
            .collect();

        let mut edges: Vec<(ZoneId, ZoneId)> = Vec::new();
        for (i, zone) in def.zones.iter().enumerate() {
            let from = ZoneId(i as u32);
            for name in &zone.adjacent {
                match zones.get(name) {
                    Some(&to) if to != from => {
                        edges.push((from, to));
                        edges.push((to, from));
                    }
                    _ => {}
                }
            }
        }
        edges.sort_unstable();
        edges.dedup();

        let mut offsets = vec![0; def.zones.len() + 1];
        for (from, _) in &edges {
            offsets[from.index() + 1] += 1;
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }
        let adjacency = edges.into_iter().map(|(_, to)| to).collect();

        fn index_by<T>(items: &[T], key: impl Fn(&T) -> &str) -> BTreeMap<String, usize> {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (key(item).to_owned(), i))
                .collect()
        }

        Self {
            seats: def
                .seats
                .iter()
                .enumerate()
                .map(|(i, s)| (s.clone(), PlayerId(i as u8)))
                .collect(),
            actions: index_by(&def.actions, |a| &a.id),
            lattices: index_by(&def.lattices, |l| &l.id),
            tables: index_by(&def.tables, |t| &t.id),
            metrics: index_by(&def.metrics, |m| &m.id),
            token_types: index_by(&def.token_types, |t| &t.id),
            zones,
            offsets,
            adjacency,
            def,
        }
    }

    pub fn def(&self) -> &GameDef {
        &self.def
    }

    pub fn into_inner(self) -> GameDef {
        self.def
    }

    pub fn zone_id(&self, name: &str) -> Option<ZoneId> {
        self.zones.get(name).copied()
    }

    pub fn zone(&self, id: ZoneId) -> Option<&ZoneDef> {
        self.def.zones.get(id.index())
    }

    pub fn zone_name(&self, id: ZoneId) -> &str {
        self.zone(id).map(|z| z.id.as_str()).unwrap_or("?")
    }

    pub fn zone_ids(&self) -> impl Iterator<Item = ZoneId> + '_ {
        (0..self.def.zones.len()).map(|i| ZoneId(i as u32))
    }

    pub fn neighbours(&self, id: ZoneId) -> &[ZoneId] {
        match (self.offsets.get(id.index()), self.offsets.get(id.index() + 1)) {
            (Some(&start), Some(&end)) => &self.adjacency[start..end],
            _ => &[],
        }
    }

    pub fn adjacent(&self, a: ZoneId, b: ZoneId) -> bool {
        self.neighbours(a).binary_search(&b).is_ok()
    }

    pub fn seat_id(&self, seat: &str) -> Option<PlayerId> {
        self.seats.get(seat).copied()
    }

    pub fn seat_name(&self, player: PlayerId) -> Option<&str> {
        self.def.seats.get(player.index()).map(String::as_str)
    }

    pub fn action(&self, id: &str) -> Option<&ActionDef> {
        self.actions.get(id).map(|&i| &self.def.actions[i])
    }

    /// Actions sorted by id, the order legal moves are enumerated in.
    pub fn actions_by_id(&self) -> impl Iterator<Item = &ActionDef> + '_ {
        self.actions.values().map(|&i| &self.def.actions[i])
    }

    pub fn lattice(&self, id: &str) -> Option<&LatticeDef> {
        self.lattices.get(id).map(|&i| &self.def.lattices[i])
    }

    pub fn table(&self, id: &str) -> Option<&TableDef> {
        self.tables.get(id).map(|&i| &self.def.tables[i])
    }

    pub fn metric(&self, id: &str) -> Option<&MetricDef> {
        self.metrics.get(id).map(|&i| &self.def.metrics[i])
    }

    pub fn token_type(&self, id: &str) -> Option<&TokenTypeDef> {
        self.token_types.get(id).map(|&i| &self.def.token_types[i])
    }

    pub fn victory(&self, seat: &str) -> Option<&VictoryDef> {
        self.def.victory.iter().find(|v| v.seat == seat)
    }

    pub fn var(&self, scope: VarScope, name: &str) -> Option<&VarDef> {
        self.def.vars(scope).iter().find(|v| v.name == name)
    }

    pub fn triggers(&self) -> &[TriggerDef] {
        &self.def.triggers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::ZoneDef;

    #[test]
    fn adjacency_is_symmetric_and_ordered() {
        let mut def = GameDef::new("adj", ["a"]);
        def.zones = vec![
            ZoneDef::space("hue").adjacent_to(["quangTri", "danang"]),
            ZoneDef::space("danang"),
            ZoneDef::space("quangTri").adjacent_to(["hue"]),
        ];
        let validated = ValidatedDef::intern(def);

        let hue = validated.zone_id("hue").unwrap();
        let danang = validated.zone_id("danang").unwrap();
        let quang_tri = validated.zone_id("quangTri").unwrap();

        assert_eq!(validated.neighbours(hue), &[danang, quang_tri]);
        assert_eq!(validated.neighbours(danang), &[hue]);
        assert!(validated.adjacent(quang_tri, hue));
        assert!(!validated.adjacent(danang, quang_tri));
    }
}
