// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `SessionInner`: the arena and every graph algorithm that mutates it
//! (spec.md §4.2/§4.4/§4.5/§4.6). Every method here takes `&mut self` and
//! never re-enters through the `Rc<RefCell<_>>` that wraps it — the one
//! operation that must cross that boundary (invoking a rule's body) lives in
//! `Session::run_task`, which drops its borrow first.

use crate::handles::{AnyHandle, IndexorHandle, TaskHandle, TemplateHandle};
use crate::outcome::RuleFn;
use crate::value::{composite_to_plain_value, Arg, CompositeArg};
use indexmap::IndexSet;
use rask_errors::{Error, Result};
use rask_future::{Callback, Composite, FutureId, FutureKind, FutureRecord, IndexorRecord, TaskRecord, TemplateRecord};
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub(crate) enum NormalizedRoot {
    Immediate(Value),
    Future(FutureId),
}

pub(crate) struct SessionInner {
    pub(crate) id: u64,
    pub(crate) arena: Vec<FutureRecord>,
    /// Dedup table: task hashid -> the one `Task` future with that hashid.
    /// Only tasks are deduplicated (spec.md §3/§9 Open Question (a):
    /// templates are never looked up here).
    pub(crate) tasks: HashMap<String, FutureId>,
    /// The callable bound to each task, looked up by `run_task`. Kept out of
    /// `rask_future::TaskRecord` so that crate stays a pure data model.
    pub(crate) rules: HashMap<FutureId, RuleFn>,
    /// Scoped recording tape (spec.md §4.6 `record`); `None` outside any
    /// recording scope.
    pub(crate) task_tape: Option<Vec<FutureId>>,
    /// Side table external runners consult for a cooperative scheduler
    /// (spec.md §6 supplement); the core never populates or reads this
    /// itself.
    pub(crate) storage: HashMap<String, Box<dyn Any>>,
    /// The `eval` driver's FIFO queue of ready-to-run tasks, deduplicated by
    /// membership (spec.md §4.6 step 3). Lives here rather than as a local in
    /// `eval` because `Callback::Schedule` dispatch (triggered from deep
    /// inside `set_result`/`parent_done`) needs somewhere to enqueue into.
    pub(crate) schedule_queue: IndexSet<FutureId>,
}

impl SessionInner {
    pub(crate) fn new(id: u64) -> Self {
        SessionInner {
            id,
            arena: Vec::new(),
            tasks: HashMap::new(),
            rules: HashMap::new(),
            task_tape: None,
            storage: HashMap::new(),
            schedule_queue: IndexSet::new(),
        }
    }

    fn alloc(&mut self, kind: FutureKind, pending: Vec<FutureId>) -> FutureId {
        let id = FutureId(self.arena.len() as u32);
        self.arena.push(FutureRecord::new(kind, pending));
        id
    }

    /// Of `candidates`, only the ones not yet done belong in a freshly
    /// constructed future's `pending` set (spec.md §3: "`pending`: set of
    /// parent futures not yet done").
    fn pending_of(&self, candidates: &[FutureId]) -> Vec<FutureId> {
        candidates.iter().copied().filter(|p| !self.arena[p.0 as usize].is_done()).collect()
    }

    fn tape_push(&mut self, id: FutureId) {
        if let Some(tape) = self.task_tape.as_mut() {
            tape.push(id);
        }
    }

    fn begin_record(&mut self) -> Option<Vec<FutureId>> {
        std::mem::replace(&mut self.task_tape, Some(Vec::new()))
    }

    fn end_record(&mut self, prior: Option<Vec<FutureId>>) -> Vec<FutureId> {
        std::mem::replace(&mut self.task_tape, prior).unwrap_or_default()
    }

    // ---- future kernel (spec.md §4.2) ----

    /// Idempotent; wires `id` into each currently-pending parent's
    /// `children`, and — for `Task`/`Template` only — recurses registration
    /// into those same pending parents ("registration recurses into pending
    /// parents", spec.md §4.2).
    fn register(&mut self, id: FutureId) -> bool {
        if self.arena[id.0 as usize].kernel.registered {
            return false;
        }
        self.arena[id.0 as usize].kernel.registered = true;
        let pending: Vec<FutureId> = self.arena[id.0 as usize].kernel.pending.iter().copied().collect();
        for p in &pending {
            self.arena[p.0 as usize].kernel.children.push(id);
        }
        let recurse = matches!(self.arena[id.0 as usize].kind, FutureKind::Task(_) | FutureKind::Template(_));
        if recurse {
            for p in pending {
                self.register(p);
            }
        }
        true
    }

    fn add_ready_callback(&mut self, id: FutureId, cb: Callback) {
        if self.arena[id.0 as usize].is_ready() {
            self.dispatch_ready_callback(id, cb);
        } else {
            self.arena[id.0 as usize].kernel.ready_callbacks.push(cb);
        }
    }

    fn add_done_callback(&mut self, id: FutureId, cb: Callback) {
        if self.arena[id.0 as usize].is_done() {
            self.dispatch_done_callback(id, cb);
        } else {
            self.arena[id.0 as usize].kernel.done_callbacks.push(cb);
        }
    }

    fn set_result(&mut self, id: FutureId, value: Value) {
        tracing::debug!(future = %id, "future done");
        self.arena[id.0 as usize].kernel.result = Some(value);
        let children: Vec<FutureId> = self.arena[id.0 as usize].kernel.children.clone();
        let done_callbacks: Vec<Callback> = std::mem::take(&mut self.arena[id.0 as usize].kernel.done_callbacks);
        for child in children {
            self.parent_done(child, id);
        }
        for cb in done_callbacks {
            self.dispatch_done_callback(id, cb);
        }
    }

    fn parent_done(&mut self, id: FutureId, parent: FutureId) {
        self.arena[id.0 as usize].kernel.pending.remove(&parent);
        if self.arena[id.0 as usize].is_ready() {
            tracing::debug!(future = %id, "future ready");
            let ready_callbacks: Vec<Callback> = std::mem::take(&mut self.arena[id.0 as usize].kernel.ready_callbacks);
            for cb in ready_callbacks {
                self.dispatch_ready_callback(id, cb);
            }
        }
    }

    fn dispatch_ready_callback(&mut self, id: FutureId, cb: Callback) {
        match cb {
            Callback::Schedule => {
                self.schedule_queue.insert(id);
            }
            Callback::ResolveTemplate => self.resolve_template(id),
            Callback::ResolveIndexor => self.resolve_indexor(id),
            Callback::ChainInto(_) => {
                unreachable!("ChainInto is only ever registered as a done callback")
            }
        }
    }

    fn dispatch_done_callback(&mut self, id: FutureId, cb: Callback) {
        match cb {
            Callback::ChainInto(target) => {
                let value = self.arena[id.0 as usize]
                    .kernel
                    .result
                    .clone()
                    .expect("a done callback only fires once result is set");
                self.complete_chain(target, value);
            }
            _ => unreachable!("only ChainInto is ever registered as a done callback"),
        }
    }

    /// `Future::result(default)` (spec.md §4.2).
    fn result_or_default(&self, id: FutureId, default: Option<&Value>) -> Result<Value> {
        if let Some(v) = &self.arena[id.0 as usize].kernel.result {
            return Ok(v.clone());
        }
        match default {
            Some(d) => Ok(self.default_result(id, d)),
            None => Err(Error::FutureNotDone(self.arena[id.0 as usize].kind.hashid().to_string())),
        }
    }

    /// Variant-dispatched `default_result` (spec.md §4.3/§9): only `Task`
    /// overrides this meaningfully, by delegating to its pending
    /// `future_result` when one is set; every other variant (and a task with
    /// no `future_result`) just echoes `default` unchanged.
    fn default_result(&self, id: FutureId, default: &Value) -> Value {
        if let FutureKind::Task(t) = &self.arena[id.0 as usize].kind {
            if let Some(future_result) = t.future_result {
                return self.result_or_default(future_result, Some(default)).unwrap_or_else(|_| default.clone());
            }
        }
        default.clone()
    }

    // ---- template / indexor resolution (spec.md §4.4/§4.5) ----

    fn resolve_template(&mut self, id: FutureId) {
        let (jsonstr, futures) = match &self.arena[id.0 as usize].kind {
            FutureKind::Template(t) => (t.jsonstr.clone(), t.futures.clone()),
            _ => unreachable!("ResolveTemplate only ever targets a Template"),
        };
        let mut by_hashid: HashMap<String, FutureId> = HashMap::new();
        for fid in &futures {
            by_hashid.insert(self.arena[fid.0 as usize].kind.hashid().to_string(), *fid);
        }
        let arena = &self.arena;
        let resolved = rask_future::substitute(&jsonstr, &mut |_tag, hashid| {
            let fid = by_hashid
                .get(hashid)
                .ok_or_else(|| Error::CompositeError(format!("unknown tape member {hashid}")))?;
            arena[fid.0 as usize]
                .kernel
                .result
                .clone()
                .ok_or_else(|| Error::FutureNotDone(hashid.clone()))
        });
        match resolved {
            Ok(value) => self.set_result(id, value),
            Err(e) => {
                // Every tape member is done by construction (pending is
                // only empty once every one of them has fired set_result),
                // so this only happens under a genuine bug upstream; the
                // caller already holds no pending continuation to report it
                // to, so surface it the same way an unreachable() would and
                // leave the template unresolved rather than panic.
                tracing::debug!(future = %id, error = %e, "template resolution failed");
            }
        }
    }

    fn resolve_indexor(&mut self, id: FutureId) {
        let (parent, keys) = match &self.arena[id.0 as usize].kind {
            FutureKind::Indexor(t) => (t.parent, t.keys.clone()),
            _ => unreachable!("ResolveIndexor only ever targets an Indexor"),
        };
        let Some(parent_value) = self.arena[parent.0 as usize].kernel.result.clone() else {
            tracing::debug!(future = %id, "indexor parent not done yet at resolution time");
            return;
        };
        match rask_future::walk_keys(parent_value, &keys) {
            Ok(value) => self.set_result(id, value),
            Err(e) => tracing::debug!(future = %id, error = %e, "indexor resolution failed"),
        }
    }

    // ---- promotion helpers ----

    /// Checks that `h` belongs to this session (same `session_id`, in-bounds
    /// arena slot) and returns its bare `FutureId`, or `ArgNotInSession`.
    pub(crate) fn check_handle(&self, h: &AnyHandle) -> Result<FutureId> {
        if h.session_id() != self.id || (h.id().0 as usize) >= self.arena.len() {
            return Err(Error::ArgNotInSession(h.hashid().to_string()));
        }
        Ok(h.id())
    }

    /// Checks that every embedded handle belongs to this session, then
    /// strips the session tag, yielding the bare `rask_future::Composite`
    /// tree that crate actually operates on.
    fn validate_and_strip(&self, value: &CompositeArg) -> Result<Composite> {
        Ok(match value {
            CompositeArg::Null => Composite::Null,
            CompositeArg::Bool(b) => Composite::Bool(*b),
            CompositeArg::Number(n) => Composite::Number(n.clone()),
            CompositeArg::String(s) => Composite::String(s.clone()),
            CompositeArg::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.validate_and_strip(item)?);
                }
                Composite::List(out)
            }
            CompositeArg::Map(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.validate_and_strip(v)?);
                }
                Composite::Map(out)
            }
            CompositeArg::Future(h) => Composite::Future(self.check_handle(h)?),
        })
    }

    /// `Template.from_object` (spec.md §4.1/§4.3): always wraps, even when
    /// `composite` embeds no futures — it simply collapses immediately in
    /// that case (spec.md §4.5). Callers that want the eval-root short
    /// circuit ("creation code should short-circuit and avoid wrapping")
    /// check for an empty tape themselves before calling this.
    fn wrap_in_template(&mut self, composite: Composite) -> Result<FutureId> {
        let mut embedded = Vec::new();
        rask_future::collect_future_ids(&composite, &mut embedded);

        let mut table: BTreeMap<FutureId, (&'static str, String)> = BTreeMap::new();
        for fid in &embedded {
            if table.contains_key(fid) {
                continue;
            }
            let tag = match &self.arena[fid.0 as usize].kind {
                FutureKind::Task(_) => rask_codec::TASK_TAG,
                FutureKind::Indexor(_) => rask_codec::INDEXOR_TAG,
                FutureKind::Template(_) => {
                    return Err(Error::CompositeError("a template cannot embed another template".to_string()))
                }
            };
            let hashid = self.arena[fid.0 as usize].kind.hashid().to_string();
            table.insert(*fid, (tag, hashid));
        }

        let (jsonstr, tape) = rask_future::encode_composite(&composite, &mut |id| table[&id].clone())?;
        let rec = TemplateRecord::new(jsonstr, tape.clone());
        let pending = self.pending_of(&tape);
        let id = self.alloc(FutureKind::Template(rec), pending);
        self.register(id);
        self.add_ready_callback(id, Callback::ResolveTemplate);
        Ok(id)
    }

    fn promote_arg(&mut self, arg: Arg) -> Result<FutureId> {
        match arg {
            Arg::Future(h) => self.check_handle(&h),
            Arg::Value(v) => {
                let composite = self.validate_and_strip(&v)?;
                self.wrap_in_template(composite)
            }
        }
    }

    pub(crate) fn normalize_root(&mut self, arg: Arg) -> Result<NormalizedRoot> {
        match arg {
            Arg::Future(h) => Ok(NormalizedRoot::Future(self.check_handle(&h)?)),
            Arg::Value(v) => {
                let composite = self.validate_and_strip(&v)?;
                let mut embedded = Vec::new();
                rask_future::collect_future_ids(&composite, &mut embedded);
                if embedded.is_empty() {
                    Ok(NormalizedRoot::Immediate(composite_to_plain_value(&composite)))
                } else {
                    Ok(NormalizedRoot::Future(self.wrap_in_template(composite)?))
                }
            }
        }
    }

    // ---- task creation (spec.md §4.6 `create_task`) ----

    pub(crate) fn create_task(
        &mut self,
        func_name: &'static str,
        rule_fn: RuleFn,
        args: Vec<Arg>,
        default: Option<Value>,
        label: Option<String>,
    ) -> Result<TaskHandle> {
        let mut arg_ids = Vec::with_capacity(args.len());
        for arg in args {
            arg_ids.push(self.promote_arg(arg)?);
        }
        let arg_hashids: Vec<String> =
            arg_ids.iter().map(|id| self.arena[id.0 as usize].kind.hashid().to_string()).collect();
        let (_spec, hashid) = rask_future::task_spec(func_name, &arg_hashids)?;

        if let Some(existing) = self.tasks.get(&hashid).copied() {
            self.tape_push(existing);
            return Ok(TaskHandle { id: existing, hashid, session_id: self.id });
        }

        let rec = TaskRecord::new(func_name.to_string(), arg_ids.clone(), &arg_hashids, default, label)?;
        let pending = self.pending_of(&arg_ids);
        let id = self.alloc(FutureKind::Task(rec), pending);
        self.tasks.insert(hashid.clone(), id);
        self.rules.insert(id, rule_fn);
        self.register(id);
        self.tape_push(id);
        tracing::debug!(future = %id, func = func_name, "task created");
        Ok(TaskHandle { id, hashid, session_id: self.id })
    }

    // ---- Task[key] / Indexor[key] (spec.md §4.3/§4.4) ----

    fn make_indexor(&mut self, parent: FutureId, keys: Vec<String>) -> IndexorHandle {
        let parent_hashid = self.arena[parent.0 as usize].kind.hashid().to_string();
        let rec = IndexorRecord::new(parent, &parent_hashid, keys);
        let hashid = rec.hashid.clone();
        let pending = self.pending_of(&[parent]);
        let id = self.alloc(FutureKind::Indexor(rec), pending);
        self.register(id);
        self.add_ready_callback(id, Callback::ResolveIndexor);
        IndexorHandle { id, hashid, session_id: self.id }
    }

    pub(crate) fn index_task(&mut self, task: &TaskHandle, key: String) -> IndexorHandle {
        self.make_indexor(task.id, vec![key])
    }

    pub(crate) fn index_indexor(&mut self, indexor: &IndexorHandle, key: String) -> IndexorHandle {
        let (root, mut keys) = match &self.arena[indexor.id.0 as usize].kind {
            FutureKind::Indexor(rec) => (rec.parent, rec.keys.clone()),
            _ => unreachable!("IndexorHandle always points at an Indexor"),
        };
        keys.push(key);
        self.make_indexor(root, keys)
    }

    // ---- the scheduler (spec.md §4.6 `eval`, steps 3-5) ----

    /// `extract_tasks`: BFS over `pending` edges from `root` (inclusive),
    /// collecting every `Task` not yet run. Only `pending` (not the full
    /// parent/argument list) is walked, so an already-completed branch is
    /// never revisited (SPEC_FULL.md §4 supplement).
    fn extract_tasks(&self, root: FutureId) -> Vec<FutureId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![root];
        let mut out = Vec::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let rec = &self.arena[id.0 as usize];
            if let FutureKind::Task(t) = &rec.kind {
                if !t.has_run {
                    out.push(id);
                }
            }
            stack.extend(rec.kernel.pending.iter().copied());
        }
        out
    }

    fn attach_schedule(&mut self, id: FutureId) {
        self.add_ready_callback(id, Callback::Schedule);
    }

    pub(crate) fn seed_schedule(&mut self, root: FutureId) {
        self.schedule_queue.clear();
        let tasks = self.extract_tasks(root);
        for t in tasks {
            self.attach_schedule(t);
        }
    }

    pub(crate) fn pop_scheduled(&mut self) -> Option<FutureId> {
        self.schedule_queue.shift_remove_index(0)
    }

    /// Called once a task has just run and produced a `future_result`
    /// (spec.md §4.6 step 5): re-seed the scheduler from the newly chained
    /// future, so any not-yet-run task it reaches also gets scheduled.
    pub(crate) fn reseed_from_future_result(&mut self, task: FutureId) {
        let future_result = match &self.arena[task.0 as usize].kind {
            FutureKind::Task(t) => t.future_result,
            _ => None,
        };
        if let Some(fr) = future_result {
            let tasks = self.extract_tasks(fr);
            for t in tasks {
                self.attach_schedule(t);
            }
        }
    }

    // ---- task execution bookkeeping used by Session::run_task ----

    pub(crate) fn rule_fn_for(&self, id: FutureId) -> RuleFn {
        self.rules.get(&id).cloned().expect("a scheduled task always has a bound rule")
    }

    pub(crate) fn task_args_and_default(&self, id: FutureId) -> (Vec<FutureId>, Option<Value>) {
        match &self.arena[id.0 as usize].kind {
            FutureKind::Task(t) => (t.args.clone(), t.default.clone()),
            _ => unreachable!("run_task only ever targets a Task"),
        }
    }

    pub(crate) fn effective_arg(&self, id: FutureId, default: Option<&Value>) -> Result<Value> {
        self.result_or_default(id, default)
    }

    pub(crate) fn begin_task_recording(&mut self) -> Option<Vec<FutureId>> {
        self.begin_record()
    }

    pub(crate) fn finish_task_recording(
        &mut self,
        task: FutureId,
        prior: Option<Vec<FutureId>>,
    ) {
        let children = self.end_record(prior);
        if let FutureKind::Task(t) = &mut self.arena[task.0 as usize].kind {
            t.has_run = true;
            t.children = children;
        }
    }

    pub(crate) fn is_ready(&self, id: FutureId) -> bool {
        self.arena[id.0 as usize].is_ready()
    }

    pub(crate) fn is_done(&self, id: FutureId) -> bool {
        self.arena[id.0 as usize].is_done()
    }

    pub(crate) fn commit_value(&mut self, task: FutureId, value: Value) {
        self.set_result(task, value);
    }

    /// `future_result` chaining (spec.md §4.3 "Chained" completion): stores
    /// `future` as the task's `future_result`, wiring a copy-on-done callback
    /// if it isn't already done — or completing the chain right away if it
    /// is.
    fn chain(&mut self, task: FutureId, future: FutureId) {
        if let FutureKind::Task(t) = &mut self.arena[task.0 as usize].kind {
            t.future_result = Some(future);
        }
        if self.arena[future.0 as usize].is_done() {
            let value = self.arena[future.0 as usize].kernel.result.clone().expect("checked is_done above");
            self.complete_chain(task, value);
        } else {
            self.add_done_callback(future, Callback::ChainInto(task));
        }
    }

    fn complete_chain(&mut self, task: FutureId, value: Value) {
        if let FutureKind::Task(t) = &mut self.arena[task.0 as usize].kind {
            t.future_result = None;
        }
        self.set_result(task, value);
    }

    pub(crate) fn commit_future(&mut self, task: FutureId, future: FutureId) {
        self.chain(task, future);
    }

    pub(crate) fn commit_composite(&mut self, task: FutureId, composite: CompositeArg) -> Result<()> {
        let composite = self.validate_and_strip(&composite)?;
        let future = self.wrap_in_template(composite)?;
        self.chain(task, future);
        Ok(())
    }

    pub(crate) fn result_of(&self, id: FutureId) -> Result<Value> {
        self.result_or_default(id, None)
    }

    // ---- introspection (spec.md §6: `Task.future_result()`/`has_run()`/`state`) ----

    pub(crate) fn state_of(&self, id: FutureId) -> rask_future::FutureState {
        self.arena[id.0 as usize].state()
    }

    pub(crate) fn task_has_run(&self, id: FutureId) -> bool {
        match &self.arena[id.0 as usize].kind {
            FutureKind::Task(t) => t.has_run,
            _ => unreachable!("task_has_run only ever targets a Task"),
        }
    }

    pub(crate) fn task_label(&self, id: FutureId) -> Option<String> {
        match &self.arena[id.0 as usize].kind {
            FutureKind::Task(t) => t.label.clone(),
            _ => unreachable!("task_label only ever targets a Task"),
        }
    }

    /// `Task.future_result()` (spec.md §4.3/§6): errors `TaskHasNotRun` if the
    /// task has not run yet, `TaskIsDone` if its final result is already set
    /// (both mirror the Python original's assertions in `Task.future_result`).
    pub(crate) fn task_future_result(&self, id: FutureId) -> Result<AnyHandle> {
        let t = match &self.arena[id.0 as usize].kind {
            FutureKind::Task(t) => t,
            _ => unreachable!("task_future_result only ever targets a Task"),
        };
        if !t.has_run {
            return Err(Error::TaskHasNotRun(t.hashid.clone()));
        }
        match t.future_result {
            Some(fr) => Ok(self.handle_for(fr)),
            None => Err(Error::TaskIsDone(t.hashid.clone())),
        }
    }

    fn handle_for(&self, id: FutureId) -> AnyHandle {
        let hashid = self.arena[id.0 as usize].kind.hashid().to_string();
        match &self.arena[id.0 as usize].kind {
            FutureKind::Task(_) => AnyHandle::Task(TaskHandle { id, hashid, session_id: self.id }),
            FutureKind::Template(_) => AnyHandle::Template(TemplateHandle { id, hashid, session_id: self.id }),
            FutureKind::Indexor(_) => AnyHandle::Indexor(IndexorHandle { id, hashid, session_id: self.id }),
        }
    }

    pub(crate) fn storage_insert(&mut self, key: String, value: Box<dyn Any>) {
        self.storage.insert(key, value);
    }

    pub(crate) fn storage_get(&self, key: &str) -> Option<&(dyn Any)> {
        self.storage.get(key).map(|b| b.as_ref())
    }
}
