//! 核心宏定义

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use brain_runtime::impl_default;
///
/// struct Limits {
///     max_jobs: usize,
///     label: String,
/// }
///
/// impl_default!(Limits {
///     max_jobs: 64,
///     label: String::from("brain"),
/// });
///
/// assert_eq!(Limits::default().max_jobs, 64);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
