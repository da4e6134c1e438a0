#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use vocab_knowledge::{CatalogEntry, InMemoryCatalog};

/// 迁移测试用词表：tiempo 有两个义项，banco 的规范 ID 与拼写不同，ordenador 不在目录中
pub fn test_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(vec![
        CatalogEntry::new("hola", "hola", &["greetings"]),
        CatalogEntry::new("gato", "gato", &["animals"]),
        CatalogEntry::new("perro", "perro", &["animals"]),
        CatalogEntry::new("tiempo_time", "tiempo", &["time"]),
        CatalogEntry::new("tiempo_weather", "tiempo", &["weather"]),
        CatalogEntry::new("banco_bank", "banco", &["city"]),
        CatalogEntry::new("libro", "libro", &["school"]).inactive(),
    ])
}

/// 捕获 tracing 输出的缓冲区
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 在线程局部 subscriber 下运行闭包，返回结果与日志文本
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, buffer.contents())
}
