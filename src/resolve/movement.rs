//! Movement rounds.
//!
//! A round resolves in stages: danger zone crossings, the first leg of every
//! move, horse second legs, then sieges and the castle count. Within a stage
//! the resolver sweeps until every leg is settled. Each sweep
//!
//! 1. settles what needs no dice: bounces against one's own staying unit,
//!    moves into empty controlled or sea areas, broken transport chains;
//! 2. collects every battle that is ready: border battles between opposing
//!    moves, and area battles whose defender is not itself trying to leave;
//! 3. decides where each support goes, stopping the whole pass if a
//!    supporting player still has to choose;
//! 4. fights the battles in area order.
//!
//! If a sweep changes nothing, the remaining moves wait on each other in a
//! cycle. The units of one cycle are lifted off the board so each destination
//! counts as vacated; a lifted unit that fails goes home if home is still
//! empty and is lost otherwise.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::battle::{leaders, Battle, BattleResult, Modifier, ModifierType};
use super::dice::DiceRoller;
use super::outcome::{OrderStatus, Resolution, ResolvedOrder, RoundResult};
use super::round::{ResolveError, Step, SupportKey, SupportQuery};
use super::rules::{terrain_applies, Attack, CombatRules};
use super::transport::{find_transport_path, TransportPath};
use crate::board::{AreaId, BoardMap, BoardState, Order, OrderType, Player, Unit, UnitType};

/// One step of a move: a first leg, or a horse's second leg.
#[derive(Debug, Clone)]
struct Leg {
    order: usize,
    player: Player,
    unit_type: UnitType,
    origin: AreaId,
    dest: AreaId,
    via: Option<AreaId>,
    /// Came through a danger zone and survived.
    surprise: bool,
    /// Danger zones along the transport chain have been rolled for.
    crossed: bool,
    /// Unit lifted out of a move cycle.
    carried: Option<Unit>,
    done: bool,
}

impl Leg {
    fn new(
        order: usize,
        player: Player,
        unit_type: UnitType,
        origin: AreaId,
        dest: AreaId,
        via: Option<AreaId>,
    ) -> Self {
        Leg {
            order,
            player,
            unit_type,
            origin,
            dest,
            via,
            surprise: false,
            crossed: false,
            carried: None,
            done: false,
        }
    }
}

#[derive(Debug, Clone)]
enum Fight {
    /// Two moves meeting head-on; `first` starts from the lower area.
    Border { first: usize, second: usize },
    /// Attackers sorted by origin, plus whatever unit holds the area.
    Area { area: AreaId, attackers: Vec<usize> },
}

pub(crate) struct Movement<'a> {
    rules: &'a CombatRules,
    map: Arc<BoardMap>,
    state: BoardState,
    orders: &'a [Order],
    answers: &'a BTreeMap<SupportKey, Option<Player>>,
    dice: &'a mut dyn DiceRoller,
    status: Vec<Option<OrderStatus>>,
    /// Order index of the unit standing in each area.
    unit_order: Vec<Option<usize>>,
    /// Supports that are neither cut nor lost in a danger zone.
    support_live: Vec<bool>,
    legs: Vec<Leg>,
    battles: BTreeMap<String, Vec<Battle>>,
}

impl<'a> Movement<'a> {
    pub(crate) fn new(
        rules: &'a CombatRules,
        state: &BoardState,
        orders: &'a [Order],
        answers: &'a BTreeMap<SupportKey, Option<Player>>,
        dice: &'a mut dyn DiceRoller,
    ) -> Self {
        let map = Arc::clone(state.shared_map());
        let mut unit_order = vec![None; map.len()];
        for (i, order) in orders.iter().enumerate() {
            if order.order_type != OrderType::Build && state.unit(order.from).is_some() {
                unit_order[order.from.index()] = Some(i);
            }
        }

        Movement {
            rules,
            map,
            state: state.clone(),
            orders,
            answers,
            dice,
            status: vec![None; orders.len()],
            unit_order,
            support_live: vec![false; orders.len()],
            legs: Vec::new(),
            battles: BTreeMap::new(),
        }
    }

    pub(crate) fn resolve(mut self) -> Result<Step, ResolveError> {
        self.place_supports();

        self.legs = self.first_legs();
        self.cross_danger_zones(true);
        if let Some(queries) = self.settle_legs()? {
            return Ok(Step::NeedSupport(queries));
        }

        self.legs = self.second_legs();
        self.cross_danger_zones(false);
        if let Some(queries) = self.settle_legs()? {
            return Ok(Step::NeedSupport(queries));
        }

        self.resolve_sieges();
        let winner = self.winner();
        Ok(Step::Done(Box::new(self.finish(winner))))
    }

    /// A support is cut when another player moves against its area.
    fn place_supports(&mut self) {
        let orders = self.orders;
        for (i, order) in orders.iter().enumerate() {
            if order.order_type != OrderType::Support {
                continue;
            }
            let cut = orders
                .iter()
                .any(|o| o.is_move() && o.player != order.player && o.to == Some(order.from));
            self.support_live[i] = !cut;
            if cut {
                debug!(area = self.map.name_of(order.from), "support cut");
                self.status[i] = Some(OrderStatus::Failed);
            }
        }
    }

    fn first_legs(&mut self) -> Vec<Leg> {
        let orders = self.orders;
        let mut legs = Vec::new();
        for (i, order) in orders.iter().enumerate() {
            if !order.is_move() {
                continue;
            }
            let unit_type = self.state.unit(order.from).map(|u| u.unit_type);
            let (Some(to), Some(unit_type)) = (order.to, unit_type) else {
                self.status[i] = Some(OrderStatus::Failed);
                continue;
            };
            legs.push(Leg::new(
                i,
                order.player.clone(),
                unit_type,
                order.from,
                to,
                order.via,
            ));
        }
        legs
    }

    /// Second legs for horses that reached their first destination.
    fn second_legs(&self) -> Vec<Leg> {
        self.orders
            .iter()
            .enumerate()
            .filter_map(|(i, order)| {
                let (Some(to), Some(second)) = (order.to, order.second_to) else {
                    return None;
                };
                if self.status[i] != Some(OrderStatus::Succeeded)
                    || self.unit_order[to.index()] != Some(i)
                {
                    return None;
                }
                let unit = self.state.unit(to)?;
                Some(Leg::new(
                    i,
                    order.player.clone(),
                    unit.unit_type,
                    to,
                    second,
                    None,
                ))
            })
            .collect()
    }

    /// Rolls for every direct leg (and optionally support) whose only
    /// relation to its target runs through a danger zone.
    fn cross_danger_zones(&mut self, include_supports: bool) {
        let orders = self.orders;
        for (i, order) in orders.iter().enumerate() {
            if let Some(li) = self.legs.iter().position(|l| l.order == i && !l.done) {
                let leg = &self.legs[li];
                if leg.via.is_some() {
                    continue;
                }
                let (origin, dest, player) = (leg.origin, leg.dest, leg.player.clone());
                let Some(zone) = self.danger_zone(origin, dest) else {
                    continue;
                };
                if self.cross(&zone, player, origin, dest) {
                    self.legs[li].surprise = true;
                } else {
                    self.perish(li);
                }
            } else if include_supports
                && order.order_type == OrderType::Support
                && self.support_live[i]
            {
                let Some(to) = order.to else {
                    continue;
                };
                let Some(zone) = self.danger_zone(order.from, to) else {
                    continue;
                };
                if !self.cross(&zone, order.player.clone(), order.from, to) {
                    self.support_live[i] = false;
                    self.status[i] = Some(OrderStatus::Failed);
                }
            }
        }
    }

    fn danger_zone(&self, from: AreaId, to: AreaId) -> Option<String> {
        self.map.neighbor(from, to)?.danger_zone.clone()
    }

    /// Rolls one danger zone crossing and records it as a battle at `to`.
    fn cross(&mut self, zone: &str, player: Player, from: AreaId, to: AreaId) -> bool {
        let dice = self.roll();
        let roll = dice.value;
        let survived = roll >= self.rules.danger_zone_threshold;
        debug!(zone, roll, survived, "danger zone crossing");
        let result = BattleResult::new(player, self.map.name_of(from).to_string(), false, vec![dice]);
        self.record(
            to,
            Battle {
                areas: vec![self.map.name_of(to).to_string()],
                results: vec![result],
                danger_zone: Some(zone.to_string()),
            },
        );
        survived
    }

    fn cross_path(&mut self, li: usize, zones: &[String]) -> bool {
        let (origin, dest, player) = {
            let leg = &self.legs[li];
            (leg.origin, leg.dest, leg.player.clone())
        };
        for zone in zones {
            if !self.cross(zone, player.clone(), origin, dest) {
                self.perish(li);
                return false;
            }
        }
        true
    }

    fn settle_legs(&mut self) -> Result<Option<Vec<SupportQuery>>, ResolveError> {
        loop {
            let pending = self.legs.iter().filter(|l| !l.done).count();
            if pending == 0 {
                return Ok(None);
            }

            let mut progressed = self.settle_uncontested();

            let fights = self.ready_fights();
            if !fights.is_empty() {
                let supports = match self.plan_supports(&fights) {
                    Ok(supports) => supports,
                    Err(queries) => return Ok(Some(queries)),
                };
                for ((_, fight), support) in fights.into_iter().zip(supports) {
                    self.fight(fight, support)?;
                }
                progressed = true;
            }

            if !progressed && !self.lift_cycle() {
                return Err(ResolveError::Stalled(pending));
            }
        }
    }

    fn settle_uncontested(&mut self) -> bool {
        let mut progressed = false;
        for li in 0..self.legs.len() {
            if self.legs[li].done {
                continue;
            }

            if self.legs[li].via.is_some() {
                match self.transport_path(li) {
                    None => {
                        debug!(order = self.legs[li].order, "transport chain broken");
                        self.bounce(li);
                        progressed = true;
                        continue;
                    }
                    Some(path) if path.attacked => continue,
                    Some(path) => {
                        if !self.legs[li].crossed {
                            self.legs[li].crossed = true;
                            progressed = true;
                            if !self.cross_path(li, &path.danger_zones) {
                                continue;
                            }
                        }
                    }
                }
            }

            let dest = self.legs[li].dest;
            let occupant = self.state.unit(dest).map(|u| u.player.clone());
            match occupant {
                Some(owner) => {
                    if owner == self.legs[li].player && !self.moving_out(dest) {
                        self.bounce(li);
                        progressed = true;
                    }
                }
                None => {
                    let contested = self
                        .legs
                        .iter()
                        .enumerate()
                        .any(|(j, l)| j != li && !l.done && l.dest == dest);
                    let open = self.state.is_controlled(dest) || self.map.area(dest).sea;
                    if !contested && open {
                        self.advance(li);
                        progressed = true;
                    }
                }
            }
        }
        progressed
    }

    fn transport_path(&self, li: usize) -> Option<TransportPath> {
        let leg = &self.legs[li];
        let via = leg.via?;
        find_transport_path(
            &self.map,
            leg.origin,
            leg.dest,
            via,
            |area| self.is_transport(area, &leg.player),
            |area| self.legs.iter().any(|l| !l.done && l.dest == area),
        )
    }

    fn is_transport(&self, area: AreaId, player: &Player) -> bool {
        self.unit_order[area.index()].is_some_and(|i| {
            let order = &self.orders[i];
            order.order_type == OrderType::Transport && &order.player == player
        })
    }

    /// Whether the unit standing in `area` still has a move to make.
    fn moving_out(&self, area: AreaId) -> bool {
        self.legs
            .iter()
            .any(|l| !l.done && l.carried.is_none() && l.origin == area)
    }

    fn leg_ready(&self, li: usize) -> bool {
        let leg = &self.legs[li];
        if leg.via.is_none() {
            return true;
        }
        leg.crossed && self.transport_path(li).is_some_and(|p| !p.attacked)
    }

    fn ready_fights(&self) -> Vec<(AreaId, Fight)> {
        let mut fights: Vec<(AreaId, u8, Fight)> = Vec::new();
        let mut engaged = vec![false; self.legs.len()];

        for (li, leg) in self.legs.iter().enumerate() {
            if leg.done || leg.via.is_some() || leg.carried.is_some() {
                continue;
            }
            let opposite = self.legs.iter().position(|o| {
                !o.done
                    && o.via.is_none()
                    && o.carried.is_none()
                    && o.origin == leg.dest
                    && o.dest == leg.origin
            });
            let Some(oi) = opposite else {
                continue;
            };
            engaged[li] = true;
            if self.legs[oi].player != leg.player && leg.origin < leg.dest {
                fights.push((leg.origin, 0, Fight::Border { first: li, second: oi }));
            }
        }

        let mut incoming: BTreeMap<AreaId, Vec<usize>> = BTreeMap::new();
        for (li, leg) in self.legs.iter().enumerate() {
            if !leg.done {
                incoming.entry(leg.dest).or_default().push(li);
            }
        }

        for (area, mut attackers) in incoming {
            if attackers.iter().any(|&li| engaged[li] || !self.leg_ready(li)) {
                continue;
            }
            if self.moving_out(area) {
                continue;
            }
            let defended = self.state.unit(area).is_some();
            let open = self.state.is_controlled(area) || self.map.area(area).sea;
            if !defended && attackers.len() == 1 && open {
                continue;
            }
            attackers.sort_by_key(|&li| self.legs[li].origin);
            fights.push((area, 1, Fight::Area { area, attackers }));
        }

        fights.sort_by_key(|(area, kind, _)| (*area, *kind));
        fights.into_iter().map(|(area, _, fight)| (area, fight)).collect()
    }

    fn battlers(&self, fight: &Fight) -> Vec<Player> {
        match fight {
            Fight::Border { first, second } => vec![
                self.legs[*first].player.clone(),
                self.legs[*second].player.clone(),
            ],
            Fight::Area { area, attackers } => {
                let mut players: Vec<Player> =
                    attackers.iter().map(|&li| self.legs[li].player.clone()).collect();
                players.extend(self.state.unit(*area).map(|u| u.player.clone()));
                players
            }
        }
    }

    /// Participants (indices into `battlers`) a support into `to` can join.
    /// In a border battle that is only the move heading into `to`.
    fn joinable(&self, fight: &Fight, to: AreaId) -> Vec<usize> {
        match fight {
            Fight::Border { first, second } => [*first, *second]
                .into_iter()
                .enumerate()
                .filter(|&(_, li)| self.legs[li].dest == to)
                .map(|(i, _)| i)
                .collect(),
            Fight::Area { area, .. } if *area == to => (0..self.battlers(fight).len()).collect(),
            Fight::Area { .. } => Vec::new(),
        }
    }

    /// Decides which participant each live support joins. Returns the open
    /// questions instead if any supporting player still has to choose.
    fn plan_supports(
        &self,
        fights: &[(AreaId, Fight)],
    ) -> Result<Vec<Vec<Vec<Modifier>>>, Vec<SupportQuery>> {
        let mut plans = Vec::with_capacity(fights.len());
        let mut queries = Vec::new();
        let mut offsets: BTreeMap<AreaId, usize> = BTreeMap::new();

        for (key_area, fight) in fights {
            let offset = offsets.entry(*key_area).or_insert(0);
            let nth = self
                .battles
                .get(self.map.name_of(*key_area))
                .map_or(0, Vec::len)
                + *offset;
            *offset += 1;

            let players = self.battlers(fight);

            let mut mods = vec![Vec::new(); players.len()];
            for (s, order) in self.orders.iter().enumerate() {
                if order.order_type != OrderType::Support || !self.support_live[s] {
                    continue;
                }
                let Some(to) = order.to else {
                    continue;
                };
                let joinable = self.joinable(fight, to);
                if joinable.is_empty() {
                    continue;
                }
                let mut candidates: Vec<Player> =
                    joinable.iter().map(|&i| players[i].clone()).collect();
                candidates.sort();
                candidates.dedup();

                let own = joinable.iter().copied().find(|&i| players[i] == order.player);
                let chosen = if own.is_some() {
                    own
                } else if candidates.len() == 1 {
                    Some(joinable[0])
                } else {
                    let key = SupportKey {
                        supporter: order.from,
                        battle_area: *key_area,
                        nth,
                    };
                    match self.answers.get(&key) {
                        Some(Some(supported)) => {
                            joinable.iter().copied().find(|&i| players[i] == *supported)
                        }
                        Some(None) => None,
                        None => {
                            queries.push(SupportQuery {
                                key,
                                player: order.player.clone(),
                                from: order.from,
                                to,
                                battlers: candidates,
                            });
                            None
                        }
                    }
                };

                if let Some(idx) = chosen {
                    mods[idx].push(self.rules.support_modifier(order.player.clone()));
                }
            }
            plans.push(mods);
        }

        if queries.is_empty() {
            Ok(plans)
        } else {
            Err(queries)
        }
    }

    fn fight(&mut self, fight: Fight, support: Vec<Vec<Modifier>>) -> Result<(), ResolveError> {
        match fight {
            Fight::Border { first, second } => self.border_battle(first, second, support),
            Fight::Area { area, attackers } => self.area_battle(area, &attackers, support),
        }
    }

    fn border_battle(
        &mut self,
        first: usize,
        second: usize,
        support: Vec<Vec<Modifier>>,
    ) -> Result<(), ResolveError> {
        let mut results = Vec::with_capacity(2);
        let mut extras = support.into_iter();
        for li in [first, second] {
            let parts = self.attack_parts(li, false, extras.next().unwrap_or_default());
            results.push(self.leg_result(li, parts));
        }

        let low = self.legs[first].origin;
        let high = self.legs[second].origin;
        let low_name = self.map.name_of(low).to_string();
        let winner = self.break_ties(&mut results, &low_name)?;
        let loser = if winner == 0 { second } else { first };
        debug!(
            between = %low_name,
            and = self.map.name_of(high),
            winner = %results[winner].player,
            "border battle"
        );

        self.destroy_leg(loser);
        self.record(
            low,
            Battle {
                areas: vec![low_name, self.map.name_of(high).to_string()],
                results,
                danger_zone: None,
            },
        );
        Ok(())
    }

    fn area_battle(
        &mut self,
        area: AreaId,
        attackers: &[usize],
        support: Vec<Vec<Modifier>>,
    ) -> Result<(), ResolveError> {
        let area_name = self.map.name_of(area).to_string();
        let controlled = self.state.is_controlled(area);
        let open = controlled || self.map.area(area).sea;
        let defender = self.state.unit(area).cloned();
        let sole = attackers.len() == 1;
        // A lone attacker only counts as sole in a conquer battle.
        let terrain = terrain_applies(
            controlled,
            defender.is_some(),
            sole && defender.is_none(),
            false,
        );

        let mut results = Vec::with_capacity(attackers.len() + 1);
        let mut extras = support.into_iter();
        for &li in attackers {
            let parts = self.attack_parts(li, terrain, extras.next().unwrap_or_default());
            results.push(self.leg_result(li, parts));
        }
        if let Some(unit) = &defender {
            let mut parts = self.rules.defense_modifiers(unit.unit_type);
            parts.extend(extras.next().unwrap_or_default());
            parts.push(self.roll());
            results.push(BattleResult::new(
                unit.player.clone(),
                area_name.clone(),
                true,
                parts,
            ));
        }
        if results.is_empty() {
            return Err(ResolveError::EmptyBattle(area_name));
        }

        if defender.is_none() && sole {
            let li = attackers[0];
            let conquered = results[0].total >= self.rules.conquer_threshold;
            debug!(area = %area_name, total = results[0].total, conquered, "conquer battle");
            self.record(
                area,
                Battle {
                    areas: vec![area_name],
                    results,
                    danger_zone: None,
                },
            );
            if conquered {
                self.advance(li);
            } else {
                self.bounce(li);
            }
            return Ok(());
        }

        let winner = self.break_ties(&mut results, &area_name)?;
        let defender_won = defender.is_some() && winner == attackers.len();
        debug!(area = %area_name, winner = %results[winner].player, defender_won, "battle");

        if defender.is_some() && !defender_won {
            self.destroy_unit_at(area);
        }
        for (i, &li) in attackers.iter().enumerate() {
            if defender_won || i != winner {
                self.destroy_leg(li);
            }
        }
        // An uncontrolled area still has to be conquered by the winner.
        if !defender_won && open {
            self.advance(attackers[winner]);
        }

        self.record(
            area,
            Battle {
                areas: vec![area_name],
                results,
                danger_zone: None,
            },
        );
        Ok(())
    }

    fn attack_parts(&mut self, li: usize, terrain: bool, support: Vec<Modifier>) -> Vec<Modifier> {
        let leg = &self.legs[li];
        let attack = Attack {
            unit: leg.unit_type,
            from: leg.origin,
            to: leg.dest,
            transported: leg.via.is_some(),
            surprise: leg.surprise,
        };
        let mut parts = self.rules.attack_modifiers(&self.map, &attack, terrain);
        parts.extend(support);
        parts.push(self.roll());
        parts
    }

    fn leg_result(&self, li: usize, parts: Vec<Modifier>) -> BattleResult {
        let leg = &self.legs[li];
        BattleResult::new(
            leg.player.clone(),
            self.map.name_of(leg.origin).to_string(),
            false,
            parts,
        )
    }

    fn roll(&mut self) -> Modifier {
        Modifier::new(ModifierType::Dice, self.dice.roll(self.rules.dice_sides))
    }

    /// Re-rolls only the tied leaders until one total stands alone.
    fn break_ties(&mut self, results: &mut [BattleResult], area: &str) -> Result<usize, ResolveError> {
        let mut rerolls = 0;
        loop {
            let top = leaders(results);
            match top.len() {
                0 => return Err(ResolveError::EmptyBattle(area.to_string())),
                1 => return Ok(top[0]),
                _ => {}
            }
            if rerolls == self.rules.max_rerolls {
                return Err(ResolveError::UnbreakableTie {
                    area: area.to_string(),
                    rerolls,
                });
            }
            rerolls += 1;
            for i in top {
                let value = self.dice.roll(self.rules.dice_sides);
                results[i].reroll(value);
            }
        }
    }

    fn record(&mut self, area: AreaId, battle: Battle) {
        self.battles
            .entry(self.map.name_of(area).to_string())
            .or_default()
            .push(battle);
    }

    /// Moves the leg's unit into its destination and takes control of it.
    fn advance(&mut self, li: usize) {
        let leg = &mut self.legs[li];
        leg.done = true;
        let unit = match leg.carried.take() {
            Some(unit) => unit,
            None => {
                self.unit_order[leg.origin.index()] = None;
                match self.state.take_unit(leg.origin) {
                    Some(unit) => unit,
                    None => return,
                }
            }
        };
        self.state.set_unit(leg.dest, Some(unit));
        self.unit_order[leg.dest.index()] = Some(leg.order);
        if !self.map.area(leg.dest).sea {
            self.state.set_control(leg.dest, Some(leg.player.clone()));
        }
        self.status[leg.order] = Some(OrderStatus::Succeeded);
    }

    /// The move fails and the unit stays where it started.
    fn bounce(&mut self, li: usize) {
        let leg = &mut self.legs[li];
        leg.done = true;
        let status = match leg.carried.take() {
            Some(unit) if self.state.unit(leg.origin).is_none() => {
                self.state.set_unit(leg.origin, Some(unit));
                self.unit_order[leg.origin.index()] = Some(leg.order);
                OrderStatus::Failed
            }
            Some(_) => OrderStatus::ContestedAndLost,
            None => OrderStatus::Failed,
        };
        self.status[leg.order] = Some(status);
    }

    /// The unit dies in a danger zone.
    fn perish(&mut self, li: usize) {
        self.remove_leg_unit(li);
        self.status[self.legs[li].order] = Some(OrderStatus::Failed);
    }

    /// The unit dies in battle.
    fn destroy_leg(&mut self, li: usize) {
        self.remove_leg_unit(li);
        self.status[self.legs[li].order] = Some(OrderStatus::ContestedAndLost);
    }

    fn remove_leg_unit(&mut self, li: usize) {
        let leg = &mut self.legs[li];
        leg.done = true;
        if leg.carried.take().is_none() {
            self.state.take_unit(leg.origin);
            self.unit_order[leg.origin.index()] = None;
        }
    }

    fn destroy_unit_at(&mut self, area: AreaId) {
        self.state.take_unit(area);
        if let Some(i) = self.unit_order[area.index()].take() {
            self.status[i] = Some(OrderStatus::ContestedAndLost);
            for leg in self.legs.iter_mut().filter(|l| l.order == i) {
                leg.done = true;
            }
        }
    }

    /// The pending leg whose unit stands in this leg's destination.
    fn blocker(&self, li: usize) -> Option<usize> {
        let dest = self.legs[li].dest;
        self.legs
            .iter()
            .position(|l| !l.done && l.carried.is_none() && l.origin == dest)
    }

    fn lift_cycle(&mut self) -> bool {
        for start in 0..self.legs.len() {
            if self.legs[start].done || self.legs[start].carried.is_some() {
                continue;
            }
            let mut chain = vec![start];
            let mut current = start;
            while let Some(next) = self.blocker(current) {
                if let Some(pos) = chain.iter().position(|&l| l == next) {
                    let cycle = chain.split_off(pos);
                    debug!(len = cycle.len(), "lifting move cycle");
                    for li in cycle {
                        let origin = self.legs[li].origin;
                        self.unit_order[origin.index()] = None;
                        self.legs[li].carried = self.state.take_unit(origin);
                    }
                    return true;
                }
                chain.push(next);
                current = next;
            }
        }
        false
    }

    fn resolve_sieges(&mut self) {
        let map = Arc::clone(&self.map);
        let mut besieged = vec![false; map.len()];
        let orders = self.orders;
        for (i, order) in orders.iter().enumerate() {
            if order.order_type != OrderType::Besiege
                || self.unit_order[order.from.index()] != Some(i)
                || self.state.is_controlled(order.from)
            {
                continue;
            }
            besieged[order.from.index()] = true;
            let count = self.state.siege_count(order.from).saturating_add(1);
            if count >= self.rules.siege_rounds {
                debug!(area = map.name_of(order.from), player = %order.player, "siege complete");
                self.state.set_control(order.from, Some(order.player.clone()));
                self.state.set_siege_count(order.from, 0);
            } else {
                self.state.set_siege_count(order.from, count);
            }
        }
        for id in map.ids() {
            if !besieged[id.index()] && self.state.siege_count(id) > 0 {
                self.state.set_siege_count(id, 0);
            }
        }
    }

    /// The player holding strictly the most castles, once that is more than
    /// the board's winning count.
    fn winner(&self) -> Option<Player> {
        let mut counts: BTreeMap<&Player, usize> = BTreeMap::new();
        for area in self.map.areas().iter().filter(|a| a.castle) {
            if let Some(player) = self.state.control(area.id) {
                *counts.entry(player).or_default() += 1;
            }
        }
        let best = counts.values().copied().max()?;
        let mut top = counts.iter().filter(|(_, &count)| count == best);
        let (player, _) = top.next()?;
        if top.next().is_some() || best <= self.map.winning_castle_count() {
            return None;
        }
        Some((*player).clone())
    }

    fn finish(self, winner: Option<Player>) -> Resolution {
        let mut orders: BTreeMap<Player, Vec<ResolvedOrder>> = BTreeMap::new();
        for (i, order) in self.orders.iter().enumerate() {
            let status = self.status[i].unwrap_or(match order.order_type {
                OrderType::Support if !self.support_live[i] => OrderStatus::Failed,
                OrderType::Move => OrderStatus::Failed,
                _ => OrderStatus::Succeeded,
            });
            orders
                .entry(order.player.clone())
                .or_default()
                .push(ResolvedOrder {
                    order: order.to_spec(&self.map),
                    status,
                });
        }

        let result = RoundResult {
            round: self.state.round,
            season: self.state.season,
            orders,
            battles: self.battles,
            winner,
        };
        Resolution {
            state: self.state,
            result,
        }
    }
}
