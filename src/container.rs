//! 依赖注入容器实现
//!
//! 以字符串为键的最小容器，内部持有四张映射表：
//! - 参数表（普通值或零参生产函数）
//! - 单例服务配方表（惰性构造，实例缓存）
//! - 工厂服务配方表（每次解析都构造新实例，解析时优先）
//! - 单例实例缓存（重新注册配方时淘汰）
//!
//! 所有操作内部原子；任何用户回调（配方、装饰器、生产函数）
//! 都在锁外执行，因此构造函数可以重入容器拉取参数或其他服务。

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::RwLock;

use crate::errors::ContainerError;
use crate::params::{params_from_json, Erased, ParamValue};

/// 服务配方：类型擦除后的构造函数，接收容器自身
pub type Recipe = Arc<dyn Fn(&Container) -> Result<Erased, ContainerError> + Send + Sync>;

/// setter 注入参数（类型擦除，配方可多次执行因此按 `Arc` 共享）
pub type MethodArg = Arc<dyn Any + Send + Sync>;

/// setter 注入能力
///
/// `call` 注册的装饰器通过该 trait 按名字调用目标方法；
/// 不支持的方法返回 [`ContainerError::UnknownMethod`]，
/// 该错误在下一次 `get` 解析时上浮，而不是在 `call` 注册时。
pub trait Invoke {
    fn call_method(&mut self, method: &str, args: &[MethodArg]) -> Result<(), ContainerError>;
}

/// 内部解析计数器（原子）
#[derive(Default)]
struct InnerStats {
    total_resolutions: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    factory_creations: AtomicUsize,
}

/// 容器统计信息
#[derive(Debug, Clone)]
pub struct ContainerStats {
    pub total_resolutions: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub factory_creations: usize,
}

impl ContainerStats {
    /// 单例缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }
}

/// 依赖注入容器
pub struct Container {
    /// 参数表
    parameters: RwLock<HashMap<String, ParamValue>>,
    /// 单例服务配方表
    callables: RwLock<HashMap<String, Recipe>>,
    /// 工厂服务配方表
    factories: RwLock<HashMap<String, Recipe>>,
    /// 单例实例缓存
    instances: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    /// 解析统计
    stats: InnerStats,
}

impl Container {
    /// 创建空容器
    pub fn new() -> Self {
        Self {
            parameters: RwLock::new(HashMap::new()),
            callables: RwLock::new(HashMap::new()),
            factories: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            stats: InnerStats::default(),
        }
    }

    /// 以初始参数表创建容器
    pub fn with_params<I>(params: I) -> Self
    where
        I: IntoIterator<Item = (String, ParamValue)>,
    {
        let container = Self::new();
        container.parameters.write().extend(params);
        container
    }

    /// 以 JSON 配置对象填充参数表并创建容器
    pub fn from_config(config: &serde_json::Value) -> Result<Self, ContainerError> {
        let container = Self::new();
        *container.parameters.write() = params_from_json(config)?;
        Ok(container)
    }

    /// 标识符校验：任何带名字的操作在触碰内部状态之前先经过这里
    fn check_name(name: &str) -> Result<(), ContainerError> {
        if name.trim().is_empty() {
            return Err(ContainerError::InvalidName);
        }
        Ok(())
    }

    // ===== 参数 =====

    /// 设置参数，覆盖同名条目（无论旧条目是值还是生产函数）
    pub fn set_param<T: Send + Sync + 'static>(
        &self,
        name: &str,
        value: T,
    ) -> Result<(), ContainerError> {
        Self::check_name(name)?;
        self.parameters
            .write()
            .insert(name.to_string(), ParamValue::of(value));
        debug!("parameter '{}' set", name);
        Ok(())
    }

    /// 把零参生产函数本身注册为参数条目
    pub fn protect<T, F>(&self, name: &str, producer: F) -> Result<(), ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::check_name(name)?;
        self.parameters
            .write()
            .insert(name.to_string(), ParamValue::producer(producer));
        debug!("parameter '{}' set to a producer", name);
        Ok(())
    }

    /// 读取参数
    ///
    /// 生产函数条目在每次读取时都会被调用，结果不缓存。
    pub fn get_param<T: Clone + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<T, ContainerError> {
        Self::check_name(name)?;
        let entry = self
            .parameters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;

        match entry {
            ParamValue::Value(value) => value.downcast_ref::<T>().cloned().ok_or_else(|| {
                ContainerError::TypeMismatch {
                    name: name.to_string(),
                    expected: type_name::<T>(),
                }
            }),
            ParamValue::Producer(producer) => {
                trace!("invoking producer for parameter '{}'", name);
                // 锁已释放，生产函数可自由执行
                let produced = producer();
                produced
                    .downcast::<T>()
                    .map(|boxed| *boxed)
                    .map_err(|_| ContainerError::TypeMismatch {
                        name: name.to_string(),
                        expected: type_name::<T>(),
                    })
            }
        }
    }

    /// 参数是否存在
    pub fn has_param(&self, name: &str) -> Result<bool, ContainerError> {
        Self::check_name(name)?;
        Ok(self.parameters.read().contains_key(name))
    }

    /// 移除参数；不存在时为空操作
    pub fn unset_param(&self, name: &str) -> Result<(), ContainerError> {
        Self::check_name(name)?;
        if self.parameters.write().remove(name).is_some() {
            debug!("parameter '{}' unset", name);
        }
        Ok(())
    }

    // ===== 服务 =====

    /// 注册单例服务配方，覆盖同名旧配方并淘汰已缓存实例
    pub fn set<T, F>(&self, name: &str, ctor: F) -> Result<(), ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        Self::check_name(name)?;
        let recipe: Recipe = Arc::new(move |container: &Container| {
            Ok(Box::new(ctor(container)) as Erased)
        });
        self.install(name, recipe);
        Ok(())
    }

    /// 注册工厂服务配方，每次 `get` 都构造新实例
    ///
    /// 与单例配方表相互独立，不淘汰缓存；解析时工厂优先。
    pub fn factory<T, F>(&self, name: &str, ctor: F) -> Result<(), ContainerError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        Self::check_name(name)?;
        let recipe: Recipe = Arc::new(move |container: &Container| {
            Ok(Box::new(ctor(container)) as Erased)
        });
        self.factories.write().insert(name.to_string(), recipe);
        debug!("factory '{}' registered", name);
        Ok(())
    }

    /// 解析服务
    ///
    /// 解析顺序：工厂配方（不缓存）→ 单例缓存 → 单例配方（构造并缓存）。
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ContainerError> {
        Self::check_name(name)?;
        self.stats.total_resolutions.fetch_add(1, Ordering::Relaxed);

        let factory = self.factories.read().get(name).cloned();
        if let Some(recipe) = factory {
            self.stats.factory_creations.fetch_add(1, Ordering::Relaxed);
            trace!("resolving '{}' through its factory recipe", name);
            let product = recipe(self)?;
            return Self::downcast_product::<T>(name, product);
        }

        let cached = self.instances.read().get(name).cloned();
        if let Some(instance) = cached {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return instance
                .downcast::<T>()
                .map_err(|_| ContainerError::TypeMismatch {
                    name: name.to_string(),
                    expected: type_name::<T>(),
                });
        }

        let recipe = self
            .callables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))?;
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        trace!("constructing singleton '{}'", name);
        // 锁外执行，配方可重入容器
        let product = recipe(self)?;
        let instance = Self::downcast_product::<T>(name, product)?;
        let erased: Arc<dyn Any + Send + Sync> = instance.clone();
        self.instances.write().insert(name.to_string(), erased);
        Ok(instance)
    }

    /// 服务是否已注册（工厂或单例配方之一即可）
    pub fn has(&self, name: &str) -> Result<bool, ContainerError> {
        Self::check_name(name)?;
        Ok(self.factories.read().contains_key(name) || self.callables.read().contains_key(name))
    }

    /// 取回 `set` 注册的原始配方（不含工厂配方表）
    pub fn raw(&self, name: &str) -> Result<Recipe, ContainerError> {
        Self::check_name(name)?;
        self.callables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    /// 扩展已注册的单例配方
    ///
    /// 函数式组合：新配方先执行原配方得到基础实例，再把实例与容器
    /// 交给装饰器，返回装饰器的结果。仅影响之后的构造；
    /// 经由 `set` 同一路径重新注册，因此已缓存实例被淘汰。
    /// 仅注册了工厂配方的名字无法扩展。
    pub fn extend<B, E, F>(&self, name: &str, decorator: F) -> Result<(), ContainerError>
    where
        B: Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: Fn(B, &Container) -> E + Send + Sync + 'static,
    {
        // 名称校验与缺失检查都发生在 raw 里
        let base = self.raw(name)?;
        let owned = name.to_string();
        let recipe: Recipe = Arc::new(move |container: &Container| {
            let product = base(container)?;
            let typed = product
                .downcast::<B>()
                .map_err(|_| ContainerError::TypeMismatch {
                    name: owned.clone(),
                    expected: type_name::<B>(),
                })?;
            Ok(Box::new(decorator(*typed, container)) as Erased)
        });
        self.install(name, recipe);
        Ok(())
    }

    /// 单例实例当前是否在缓存中
    pub fn initialized(&self, name: &str) -> Result<bool, ContainerError> {
        Self::check_name(name)?;
        Ok(self.instances.read().contains_key(name))
    }

    /// setter 注入：注册一个装饰器，在构造后调用实例的指定方法
    ///
    /// 方法调用的失败（未知方法、参数不符）在下一次 `get` 时上浮，
    /// 注册本身只要求名字存在单例配方。
    pub fn call<T>(
        &self,
        name: &str,
        method: &str,
        args: Vec<MethodArg>,
    ) -> Result<(), ContainerError>
    where
        T: Invoke + Send + Sync + 'static,
    {
        let base = self.raw(name)?;
        let owned = name.to_string();
        let method = method.to_string();
        let recipe: Recipe = Arc::new(move |container: &Container| {
            let product = base(container)?;
            let mut service = product
                .downcast::<T>()
                .map_err(|_| ContainerError::TypeMismatch {
                    name: owned.clone(),
                    expected: type_name::<T>(),
                })?;
            service.call_method(&method, &args)?;
            Ok(service as Erased)
        });
        self.install(name, recipe);
        Ok(())
    }

    /// 解析统计快照
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.stats.total_resolutions.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.stats.cache_misses.load(Ordering::Relaxed),
            factory_creations: self.stats.factory_creations.load(Ordering::Relaxed),
        }
    }

    /// 注册（或替换）单例配方并淘汰旧缓存实例；`extend` 与 `call` 复用此路径
    fn install(&self, name: &str, recipe: Recipe) {
        self.callables.write().insert(name.to_string(), recipe);
        if self.instances.write().remove(name).is_some() {
            trace!("evicted cached instance for '{}'", name);
        }
        debug!("service '{}' registered", name);
    }

    fn downcast_product<T: Send + Sync + 'static>(
        name: &str,
        product: Erased,
    ) -> Result<Arc<T>, ContainerError> {
        product
            .downcast::<T>()
            .map(Arc::from)
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
