//! Dashboard domain store.
//!
//! # Responsibility
//! - Own the in-memory aggregates of one dashboard session.
//! - Validate and apply every user mutation.
//! - Persist each touched aggregate synchronously after a mutation.
//!
//! # Invariants
//! - `xp` always stays inside `[0, rank.max_xp()]`.
//! - A rejected mutation leaves state, storage and `revision` untouched.
//! - `revision` increases by at least one for every applied change,
//!   including wholesale replacement from a remote snapshot.
//! - Completing a daily item grants XP once; un-toggling a top item never
//!   revokes XP.
//! - Daily mutations first regenerate a slot dated before today.

use crate::clock::Clock;
use crate::config::{ConfigError, DashboardConfig};
use crate::model::daily::DailySlot;
use crate::model::lead::{
    parse_lead_import, Lead, LeadDraft, LeadImportError, LeadPatch, LeadStatus,
};
use crate::model::ordering::{move_adjacent, MoveDirection};
use crate::model::rank::{xp_to_rank, Rank};
use crate::model::state::{Aggregate, AggregateSet, DashboardState};
use crate::model::task::{seed_tasks, Task};
use crate::model::todo::{Todo, TodoList};
use crate::model::top::{TopItem, TopSlot};
use crate::model::validation::{normalize_label, require_positive_xp, ValidationError};
use crate::repo::kv_repo::KvStore;
use crate::repo::persistence::LocalPersistence;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Rejected dashboard mutation.
#[derive(Debug)]
pub enum StoreError {
    Validation(ValidationError),
    NotFound { kind: &'static str, id: String },
    CapacityReached { capacity: usize },
    DuplicateTopItem { task_id: String },
    InvalidImport(LeadImportError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::CapacityReached { capacity } => {
                write!(f, "top tasks are full ({capacity} items)")
            }
            Self::DuplicateTopItem { task_id } => {
                write!(f, "task already in top tasks: {task_id}")
            }
            Self::InvalidImport(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidImport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<LeadImportError> for StoreError {
    fn from(value: LeadImportError) -> Self {
        Self::InvalidImport(value)
    }
}

fn not_found(kind: &'static str, id: &str) -> StoreError {
    StoreError::NotFound {
        kind,
        id: id.to_string(),
    }
}

/// Single-writer owner of all dashboard aggregates.
pub struct DashboardStore<S: KvStore> {
    state: DashboardState,
    config: DashboardConfig,
    persistence: LocalPersistence<S>,
    clock: Box<dyn Clock>,
    rng: StdRng,
    revision: u64,
}

impl<S: KvStore> DashboardStore<S> {
    /// Loads every aggregate from `kv`, seeding defaults on first run.
    ///
    /// Fails before touching `kv` when `config` does not validate.
    pub fn open(
        config: DashboardConfig,
        kv: S,
        clock: Box<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Self::open_with_rng(config, kv, clock, StdRng::from_entropy())
    }

    /// Same as [`open`](Self::open) with a caller-provided RNG for daily picks.
    pub fn open_with_rng(
        config: DashboardConfig,
        kv: S,
        clock: Box<dyn Clock>,
        rng: StdRng,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let persistence = LocalPersistence::new(config.namespace.clone(), kv);
        let today = clock.today();
        let state = DashboardState {
            xp: config.rank.clamp_xp(persistence.load(Aggregate::Xp, 0)),
            tasks: persistence.load(Aggregate::Tasks, seed_tasks()),
            daily: persistence.load(Aggregate::Daily, DailySlot::default()),
            top: persistence.load(Aggregate::Top, TopSlot::new(&today)),
            todos: persistence.load(Aggregate::Todos, TodoList::default()),
            leads: persistence.load(Aggregate::Leads, Vec::new()),
        };

        let mut store = Self {
            state,
            config,
            persistence,
            clock,
            rng,
            revision: 0,
        };
        store.ensure_daily_fresh();
        info!(
            "event=store_open module=store status=ok namespace={} xp={} tasks={} todos={} leads={}",
            store.config.namespace,
            store.state.xp,
            store.state.tasks.len(),
            store.state.todos.items.len(),
            store.state.leads.len()
        );
        Ok(store)
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn persistence(&self) -> &LocalPersistence<S> {
        &self.persistence
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn xp(&self) -> i64 {
        self.state.xp
    }

    /// Rank derived from the current XP.
    pub fn rank(&self) -> Rank {
        xp_to_rank(self.state.xp, &self.config.rank)
    }

    pub fn today(&self) -> String {
        self.clock.today()
    }

    /// Wall-clock milliseconds from the injected clock.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    // ----- xp -----

    /// Adds (or subtracts) XP, clamped to the ladder. Returns the new total.
    pub fn add_xp(&mut self, amount: i64) -> i64 {
        let next = self.config.rank.clamp_xp(self.state.xp.saturating_add(amount));
        self.set_xp(next)
    }

    /// Sets XP to `value`, clamped to the ladder. Returns the new total.
    pub fn set_xp_exact(&mut self, value: i64) -> i64 {
        let next = self.config.rank.clamp_xp(value);
        self.set_xp(next)
    }

    /// Starts a new season at zero XP.
    pub fn reset_season(&mut self) {
        self.set_xp(0);
        info!("event=season_reset module=store status=ok");
    }

    fn set_xp(&mut self, next: i64) -> i64 {
        if next != self.state.xp {
            debug!(
                "event=xp_change module=store status=ok from={} to={}",
                self.state.xp, next
            );
            self.state.xp = next;
            self.touch(Aggregate::Xp);
        }
        next
    }

    // ----- tasks -----

    pub fn add_task(&mut self, label: &str, xp: i64, group: Option<&str>) -> StoreResult<String> {
        let task = Task::new(label, xp, group)?;
        let id = task.id.clone();
        self.state.tasks.push(task);
        self.touch(Aggregate::Tasks);
        Ok(id)
    }

    pub fn remove_task(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .state
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| not_found("task", id))?;
        self.state.tasks.remove(index);
        self.touch(Aggregate::Tasks);
        Ok(())
    }

    // ----- daily challenges -----

    /// Regenerates the daily slot when it is stale. Returns whether it did.
    pub fn ensure_daily_fresh(&mut self) -> bool {
        let today = self.clock.today();
        if !self.state.daily.is_stale(&today) {
            return false;
        }
        debug!(
            "event=daily_regenerate module=store status=ok reason=stale previous_date={}",
            self.state.daily.date
        );
        self.state.daily = DailySlot::generate(&today, &mut self.rng);
        self.touch(Aggregate::Daily);
        true
    }

    /// Marks a daily item done and grants its XP.
    ///
    /// Returns `Ok(false)` without granting anything when the item is already
    /// done.
    pub fn complete_daily(&mut self, id: &str) -> StoreResult<bool> {
        self.ensure_daily_fresh();
        let item = self
            .state
            .daily
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| not_found("daily challenge", id))?;
        if item.done {
            return Ok(false);
        }
        item.done = true;
        let grant = item.xp;
        self.touch(Aggregate::Daily);
        self.add_xp(grant);
        Ok(true)
    }

    /// Replaces one daily item with a pool entry not already shown.
    pub fn reroll_daily(&mut self, id: &str) -> StoreResult<()> {
        self.ensure_daily_fresh();
        if !self.state.daily.reroll(id, &mut self.rng) {
            return Err(not_found("daily challenge", id));
        }
        self.touch(Aggregate::Daily);
        Ok(())
    }

    /// Draws three fresh challenges for today.
    pub fn refresh_today(&mut self) {
        let today = self.clock.today();
        self.state.daily = DailySlot::generate(&today, &mut self.rng);
        self.touch(Aggregate::Daily);
    }

    // ----- top tasks -----

    /// Whether the top slot was stamped on an earlier day. Never auto-clears.
    pub fn is_top_stale(&self) -> bool {
        self.state.top.is_stale(&self.clock.today())
    }

    /// Copies task `task_id` into the top slot.
    pub fn add_top_from_task(&mut self, task_id: &str) -> StoreResult<String> {
        let task = self
            .state
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .ok_or_else(|| not_found("task", task_id))?;
        self.ensure_top_capacity()?;
        if self.state.top.contains_task_copy(&task.id, &task.label) {
            return Err(StoreError::DuplicateTopItem {
                task_id: task.id.clone(),
            });
        }

        let item = TopItem {
            id: Uuid::new_v4().to_string(),
            label: task.label.clone(),
            xp: task.xp,
            done: false,
            source_task_id: Some(task.id.clone()),
        };
        Ok(self.push_top(item))
    }

    /// Adds a free-standing top item.
    pub fn add_top_custom(&mut self, label: &str, xp: i64) -> StoreResult<String> {
        let label = normalize_label(label)?;
        let xp = require_positive_xp(xp)?;
        self.ensure_top_capacity()?;
        let item = TopItem {
            id: Uuid::new_v4().to_string(),
            label,
            xp,
            done: false,
            source_task_id: None,
        };
        Ok(self.push_top(item))
    }

    fn ensure_top_capacity(&self) -> StoreResult<()> {
        if self.state.top.items.len() >= self.config.top_capacity {
            return Err(StoreError::CapacityReached {
                capacity: self.config.top_capacity,
            });
        }
        Ok(())
    }

    fn push_top(&mut self, item: TopItem) -> String {
        let id = item.id.clone();
        self.state.top.items.push(item);
        self.touch(Aggregate::Top);
        id
    }

    /// Flips a top item. Only the undone-to-done edge grants XP.
    ///
    /// Returns the new `done` value.
    pub fn toggle_top(&mut self, id: &str) -> StoreResult<bool> {
        let item = self
            .state
            .top
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| not_found("top item", id))?;
        item.done = !item.done;
        let (done, grant) = (item.done, item.xp);
        self.touch(Aggregate::Top);
        if done {
            self.add_xp(grant);
        }
        Ok(done)
    }

    /// Swaps a top item with its neighbour. Returns `false` at a boundary.
    pub fn move_top(&mut self, id: &str, direction: MoveDirection) -> StoreResult<bool> {
        let index = self
            .state
            .top
            .position(id)
            .ok_or_else(|| not_found("top item", id))?;
        let moved = move_adjacent(&mut self.state.top.items, index, direction);
        if moved {
            self.touch(Aggregate::Top);
        }
        Ok(moved)
    }

    pub fn remove_top(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .state
            .top
            .position(id)
            .ok_or_else(|| not_found("top item", id))?;
        self.state.top.items.remove(index);
        self.touch(Aggregate::Top);
        Ok(())
    }

    /// Empties the top slot and stamps it with today's date.
    pub fn reset_top(&mut self) {
        self.state.top = TopSlot::new(&self.clock.today());
        self.touch(Aggregate::Top);
    }

    // ----- todos -----

    pub fn add_todo(&mut self, label: &str) -> StoreResult<String> {
        let todo = Todo {
            id: Uuid::new_v4().to_string(),
            label: normalize_label(label)?,
            done: false,
        };
        let id = todo.id.clone();
        self.state.todos.items.push(todo);
        self.touch(Aggregate::Todos);
        Ok(id)
    }

    /// Flips a todo and returns its new `done` value.
    pub fn toggle_todo(&mut self, id: &str) -> StoreResult<bool> {
        let todo = self
            .state
            .todos
            .items
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| not_found("todo", id))?;
        todo.done = !todo.done;
        let done = todo.done;
        self.touch(Aggregate::Todos);
        Ok(done)
    }

    pub fn remove_todo(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .state
            .todos
            .position(id)
            .ok_or_else(|| not_found("todo", id))?;
        self.state.todos.items.remove(index);
        self.touch(Aggregate::Todos);
        Ok(())
    }

    pub fn move_todo(&mut self, id: &str, direction: MoveDirection) -> StoreResult<bool> {
        let index = self
            .state
            .todos
            .position(id)
            .ok_or_else(|| not_found("todo", id))?;
        let moved = move_adjacent(&mut self.state.todos.items, index, direction);
        if moved {
            self.touch(Aggregate::Todos);
        }
        Ok(moved)
    }

    /// Removes every completed todo. Returns how many were dropped.
    pub fn clear_completed_todos(&mut self) -> usize {
        let removed = self.state.todos.clear_completed();
        if removed > 0 {
            self.touch(Aggregate::Todos);
        }
        removed
    }

    // ----- leads -----

    pub fn add_lead(&mut self, draft: LeadDraft) -> StoreResult<String> {
        let lead = Lead::from_draft(draft, self.clock.now_ms())?;
        let id = lead.id.clone();
        self.state.leads.push(lead);
        self.touch(Aggregate::Leads);
        Ok(id)
    }

    /// Applies a patch; `updated_at` is refreshed even for an empty patch.
    pub fn update_lead(&mut self, id: &str, patch: LeadPatch) -> StoreResult<()> {
        let now_ms = self.clock.now_ms();
        let lead = self
            .state
            .leads
            .iter_mut()
            .find(|lead| lead.id == id)
            .ok_or_else(|| not_found("lead", id))?;
        lead.apply_patch(patch, now_ms)?;
        self.touch(Aggregate::Leads);
        Ok(())
    }

    pub fn remove_lead(&mut self, id: &str) -> StoreResult<()> {
        let index = self
            .state
            .leads
            .iter()
            .position(|lead| lead.id == id)
            .ok_or_else(|| not_found("lead", id))?;
        self.state.leads.remove(index);
        self.touch(Aggregate::Leads);
        Ok(())
    }

    /// Appends leads parsed from a JSON array. Returns how many were added.
    pub fn import_leads(&mut self, text: &str) -> StoreResult<usize> {
        let existing: HashSet<String> =
            self.state.leads.iter().map(|lead| lead.id.clone()).collect();
        let imported = parse_lead_import(text, &existing, self.clock.now_ms())?;
        let count = imported.len();
        if count > 0 {
            self.state.leads.extend(imported);
            self.touch(Aggregate::Leads);
        }
        info!("event=lead_import module=store status=ok imported={count}");
        Ok(count)
    }

    /// Pretty JSON array of every lead.
    pub fn export_leads_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.state.leads)
    }

    /// Lead count per pipeline status, zero-filled.
    pub fn lead_counts_by_status(&self) -> BTreeMap<LeadStatus, usize> {
        let mut counts: BTreeMap<LeadStatus, usize> =
            LeadStatus::ALL.into_iter().map(|status| (status, 0)).collect();
        for lead in &self.state.leads {
            *counts.entry(lead.status).or_insert(0) += 1;
        }
        counts
    }

    // ----- remote application -----

    /// Overwrites every aggregate present in `set`, wholesale.
    ///
    /// Returns the aggregates that were replaced, in `Aggregate::ALL` order.
    pub fn replace_aggregates(&mut self, set: AggregateSet) -> Vec<Aggregate> {
        let mut applied = Vec::new();
        if let Some(xp) = set.xp {
            self.state.xp = self.config.rank.clamp_xp(xp);
            applied.push(Aggregate::Xp);
        }
        if let Some(tasks) = set.tasks {
            self.state.tasks = tasks;
            applied.push(Aggregate::Tasks);
        }
        if let Some(daily) = set.daily {
            self.state.daily = daily;
            applied.push(Aggregate::Daily);
        }
        if let Some(top) = set.top {
            self.state.top = top;
            applied.push(Aggregate::Top);
        }
        if let Some(todos) = set.todos {
            self.state.todos = todos;
            applied.push(Aggregate::Todos);
        }
        if let Some(leads) = set.leads {
            self.state.leads = leads;
            applied.push(Aggregate::Leads);
        }
        for aggregate in &applied {
            self.touch(*aggregate);
        }
        applied
    }

    fn touch(&mut self, aggregate: Aggregate) {
        let state = &self.state;
        match aggregate {
            Aggregate::Xp => self.persistence.save(aggregate, &state.xp),
            Aggregate::Tasks => self.persistence.save(aggregate, &state.tasks),
            Aggregate::Daily => self.persistence.save(aggregate, &state.daily),
            Aggregate::Top => self.persistence.save(aggregate, &state.top),
            Aggregate::Todos => self.persistence.save(aggregate, &state.todos),
            Aggregate::Leads => self.persistence.save(aggregate, &state.leads),
        };
        self.revision += 1;
    }
}
