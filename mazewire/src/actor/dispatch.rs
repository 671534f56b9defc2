/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde_json::{Map, Value};

use crate::common::MethodHandler;
use crate::message::MessageError;

/// Built-in method listing every exposed method with its documentation.
pub const INTROSPECT_METHOD: &str = "introspect";
const INTROSPECT_PREFIX: &str = "introspect:";

/// Method name → handler table of one actor, with optional per-method docs.
///
/// Populated while the actor is idle, read-only once it runs.
pub(crate) struct DispatchTable<State: Default + Send + Debug + 'static> {
    handlers: BTreeMap<String, Box<MethodHandler<State>>>,
    docs: BTreeMap<String, String>,
}

pub(crate) enum Lookup<'a, State: Default + Send + Debug + 'static> {
    Handler(&'a MethodHandler<State>),
    Introspection(Value),
    Missing(MessageError),
}

impl<State: Default + Send + Debug + 'static> Default for DispatchTable<State> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
            docs: BTreeMap::new(),
        }
    }
}

impl<State: Default + Send + Debug + 'static> DispatchTable<State> {
    /// Returns `true` if an earlier handler for `method` was replaced.
    pub(crate) fn insert(&mut self, method: String, handler: Box<MethodHandler<State>>) -> bool {
        self.handlers.insert(method, handler).is_some()
    }

    pub(crate) fn describe(&mut self, method: String, doc: String) {
        self.docs.insert(method, doc);
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }

    pub(crate) fn lookup(&self, method: &str) -> Lookup<'_, State> {
        if let Some(handler) = self.handlers.get(method) {
            return Lookup::Handler(handler.as_ref());
        }
        if method == INTROSPECT_METHOD {
            return Lookup::Introspection(self.catalogue());
        }
        if let Some(target) = method.strip_prefix(INTROSPECT_PREFIX) {
            return if self.handlers.contains_key(target) {
                Lookup::Introspection(self.doc(target))
            } else {
                Lookup::Missing(MessageError::UnknownMethod(target.to_owned()))
            };
        }
        Lookup::Missing(MessageError::UnknownMethod(method.to_owned()))
    }

    fn doc(&self, method: &str) -> Value {
        self.docs
            .get(method)
            .map_or(Value::Null, |doc| Value::String(doc.clone()))
    }

    fn catalogue(&self) -> Value {
        let entries: Map<String, Value> = self
            .handlers
            .keys()
            .map(|method| (method.clone(), self.doc(method)))
            .collect();
        Value::Object(entries)
    }
}
