use js_sys::{Function, Promise};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Mutex;
use utils_common::Sentiment;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

// 导出模块
pub mod assembler;
pub mod builder;
pub mod clause;
pub mod compiler;
pub mod logging;
pub mod models;
pub mod pagination;
pub mod postgrest;
pub mod session;
pub mod stats;
pub mod store;

pub use assembler::{assemble, PageWindow, QueryPlan, SortKey};
pub use clause::{ClauseValue, Comparison, FieldName, Operator, PredicateClause};
pub use compiler::{compile, compile_term, DateRangeSpec, NumericRangeSpec};
pub use models::{DashboardConfig, DateRangeInput, FilterCategory, FilterState, RawFilterInput};
pub use pagination::PaginationState;
pub use postgrest::PostgrestRequest;
pub use session::{DashboardSession, FetchOutcome, PendingFetch, ViewStatus};
pub use stats::DashboardStats;
pub use store::{MemoryStore, RecordPage, RecordStore, StoreError};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

// 离线快照存储
static SNAPSHOT: OnceCell<Mutex<Option<MemoryStore>>> = OnceCell::new();

/// 初始化函数 - 设置错误处理
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// 版本信息
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// 编译单个筛选词，返回条件列表
#[wasm_bindgen]
pub fn compile_filter(term: &str, category: &str) -> Result<JsValue, JsValue> {
    let category: FilterCategory = category.parse().map_err(|e: String| JsValue::from_str(&e))?;
    let clauses = compile_term(term, category);
    serde_wasm_bindgen::to_value(&clauses)
        .map_err(|e| JsValue::from_str(&format!("序列化条件失败: {}", e)))
}

/// 加载离线快照，返回推文数量
#[wasm_bindgen]
pub fn load_snapshot(data: &[u8]) -> Result<usize, JsValue> {
    let store = MemoryStore::from_snapshot(data).map_err(|e| {
        console_error!("加载快照失败: {}", e);
        JsValue::from_str(&e.to_string())
    })?;
    let count = store.len();

    let cell = SNAPSHOT.get_or_init(|| Mutex::new(None));
    let mut guard = cell.lock().map_err(|_| JsValue::from_str("获取快照锁失败"))?;
    *guard = Some(store);

    console_log!("快照已加载，推文数量: {}", count);
    Ok(count)
}

/// 离线快照的概览统计
#[wasm_bindgen]
pub fn snapshot_stats() -> Result<JsValue, JsValue> {
    let stats = with_snapshot(|store| DashboardStats::from_records(store.records()))?;
    serde_wasm_bindgen::to_value(&stats)
        .map_err(|e| JsValue::from_str(&format!("序列化统计失败: {}", e)))
}

fn with_snapshot<T>(f: impl FnOnce(&MemoryStore) -> T) -> Result<T, JsValue> {
    let cell = SNAPSHOT
        .get()
        .ok_or_else(|| JsValue::from_str(&StoreError::NoSnapshot.to_string()))?;
    let guard = cell.lock().map_err(|_| JsValue::from_str("获取快照锁失败"))?;
    let store = guard
        .as_ref()
        .ok_or_else(|| JsValue::from_str(&StoreError::NoSnapshot.to_string()))?;
    Ok(f(store))
}

/// 交给宿主页面执行的请求
#[derive(Serialize)]
struct FetchPayload<'a> {
    sequence: u64,
    plan: &'a QueryPlan,
    request: &'a PostgrestRequest,
    query_string: String,
}

impl<'a> FetchPayload<'a> {
    fn new(pending: &'a PendingFetch, request: &'a PostgrestRequest) -> Self {
        Self {
            sequence: pending.sequence,
            plan: &pending.plan,
            request,
            query_string: request.query_string(),
        }
    }
}

/// 仪表盘 JS 接口 - 提供给 JavaScript 使用的筛选、分页和请求协调
#[wasm_bindgen]
pub struct TweetDashboardJS {
    session: Rc<RefCell<DashboardSession>>,
    config: DashboardConfig,
}

#[wasm_bindgen]
impl TweetDashboardJS {
    /// 创建会话，config_json 为空时使用默认配置
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<TweetDashboardJS, JsValue> {
        let config = DashboardConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e))?;
        Ok(Self {
            session: Rc::new(RefCell::new(DashboardSession::new(&config))),
            config,
        })
    }

    /// 单搜索框加类别选择器，返回筛选是否变化
    pub fn set_search(&self, term: &str, category: &str) -> Result<bool, JsValue> {
        let category: FilterCategory = category.parse().map_err(|e: String| JsValue::from_str(&e))?;
        Ok(self.session.borrow_mut().set_search(term, category))
    }

    /// 以 JSON 替换整个筛选状态
    pub fn set_filters(&self, filters_json: &str) -> Result<bool, JsValue> {
        let filters: FilterState = serde_json::from_str(filters_json)
            .map_err(|e| JsValue::from_str(&format!("解析筛选状态失败: {}", e)))?;
        Ok(self.session.borrow_mut().set_filters(filters))
    }

    /// 情感筛选，空字符串或未知标签表示不筛选
    pub fn set_sentiment(&self, label: Option<String>) -> bool {
        let sentiment = label.as_deref().and_then(Sentiment::from_label);
        self.session.borrow_mut().set_sentiment(sentiment)
    }

    pub fn set_date_range(&self, from: Option<String>, to: Option<String>) -> bool {
        self.session.borrow_mut().set_date_range(from, to)
    }

    pub fn clear_filters(&self) {
        self.session.borrow_mut().clear_filters();
    }

    pub fn next_page(&self) {
        self.session.borrow_mut().next_page();
    }

    pub fn previous_page(&self) {
        self.session.borrow_mut().previous_page();
    }

    /// 发出请求，返回 { sequence, plan, request, query_string }
    pub fn begin_fetch(&self) -> Result<JsValue, JsValue> {
        let pending = self.session.borrow_mut().issue();
        let request = PostgrestRequest::from_plan(&self.config, &pending.plan);
        serde_wasm_bindgen::to_value(&FetchPayload::new(&pending, &request))
            .map_err(|e| JsValue::from_str(&format!("序列化请求失败: {}", e)))
    }

    /// 提交成功的响应 { records, total_count }，返回 applied 或 stale
    pub fn apply_response(&self, sequence: u32, page: JsValue) -> Result<JsValue, JsValue> {
        let result = serde_wasm_bindgen::from_value::<RecordPage>(page)
            .map_err(|e| StoreError::Decode(e.to_string()));
        let outcome = self.session.borrow_mut().complete(u64::from(sequence), result);
        serde_wasm_bindgen::to_value(&outcome).map_err(JsValue::from)
    }

    /// 提交失败的响应，之前的结果保持显示
    pub fn fail_response(&self, sequence: u32, message: &str) -> Result<JsValue, JsValue> {
        let outcome = self
            .session
            .borrow_mut()
            .complete(u64::from(sequence), Err(StoreError::Unavailable(message.to_string())));
        serde_wasm_bindgen::to_value(&outcome).map_err(JsValue::from)
    }

    /// 完整请求周期: 用计划调用 executor，等待其返回的 Promise 并提交结果
    pub fn fetch(&self, executor: Function) -> Promise {
        let session = Rc::clone(&self.session);
        let config = self.config.clone();

        future_to_promise(async move {
            let pending = session.borrow_mut().issue();
            let request = PostgrestRequest::from_plan(&config, &pending.plan);
            let payload = serde_wasm_bindgen::to_value(&FetchPayload::new(&pending, &request))?;

            let result = match executor.call1(&JsValue::NULL, &payload) {
                Ok(value) => match JsFuture::from(Promise::resolve(&value)).await {
                    Ok(page) => serde_wasm_bindgen::from_value::<RecordPage>(page)
                        .map_err(|e| StoreError::Decode(e.to_string())),
                    Err(e) => Err(StoreError::Unavailable(js_message(&e))),
                },
                Err(e) => Err(StoreError::Unavailable(js_message(&e))),
            };

            let outcome = session.borrow_mut().complete(pending.sequence, result);
            Ok(serde_wasm_bindgen::to_value(&outcome)?)
        })
    }

    /// 在离线快照上执行当前计划
    pub fn query_snapshot(&self) -> Result<JsValue, JsValue> {
        let outcome = match SNAPSHOT.get().and_then(|cell| cell.lock().ok()) {
            Some(guard) => match guard.as_ref() {
                Some(store) => self.session.borrow_mut().refresh(store),
                None => self.fail_missing_snapshot(),
            },
            None => self.fail_missing_snapshot(),
        };
        serde_wasm_bindgen::to_value(&outcome).map_err(JsValue::from)
    }

    /// 渲染层读取的完整状态
    pub fn state(&self) -> Result<JsValue, JsValue> {
        let session = self.session.borrow();
        serde_wasm_bindgen::to_value(&session.view())
            .map_err(|e| JsValue::from_str(&format!("序列化状态失败: {}", e)))
    }

    /// 当前计划对应的 PostgREST 地址
    pub fn request_url(&self, base_url: &str) -> String {
        let plan = self.session.borrow().plan();
        PostgrestRequest::from_plan(&self.config, &plan).url(base_url)
    }
}

impl TweetDashboardJS {
    fn fail_missing_snapshot(&self) -> FetchOutcome {
        let mut session = self.session.borrow_mut();
        let pending = session.issue();
        session.complete(pending.sequence, Err(StoreError::NoSnapshot))
    }
}

fn js_message(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
