// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The contract for asynchronous enrichment steps.

use crate::state::Section;
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt::Debug;

/// A step run against the metric state each time a snapshot is requested.
///
/// Returning `Ok(())` lets the chain proceed; returning `Err` is recorded as a
/// helper failure and the chain proceeds anyway. Steps run one at a time, in
/// registration order.
///
/// Concrete helpers live next to what they observe: stat reporters in
/// `vigil-telemetry`, OS/process introspection in `vigil-infra`.
#[async_trait]
pub trait Helper: Send + Sync + Debug + 'static {
    /// Returns a human-readable identifier for logs.
    fn helper_id(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    /// Enriches the state addressed by `section`.
    async fn run(&self, section: &Section) -> anyhow::Result<()>;
}

/// Adapts a synchronous closure into a [`Helper`].
pub struct FnHelper<F> {
    id: Cow<'static, str>,
    f: F,
}

impl<F> FnHelper<F>
where
    F: Fn(&Section) -> anyhow::Result<()> + Send + Sync + 'static,
{
    /// Wraps `f` under the identifier `id`.
    pub fn new(id: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { id: id.into(), f }
    }
}

impl<F> Debug for FnHelper<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHelper").field("id", &self.id).finish()
    }
}

#[async_trait]
impl<F> Helper for FnHelper<F>
where
    F: Fn(&Section) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn helper_id(&self) -> Cow<'static, str> {
        self.id.clone()
    }

    async fn run(&self, section: &Section) -> anyhow::Result<()> {
        (self.f)(section)
    }
}
