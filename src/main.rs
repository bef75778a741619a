use bookpack::config::DEFAULT_CONFIG_PATH;
use bookpack::epub::TocTreeStyle;
use bookpack::export::{backup_directory, resources};
use bookpack::{
    export_book, import_book, BookStore, EpubSource, MemoryStore, PackConfig, Result, TocTree,
    TracingProgress,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// 📦 BookPack - 章节树与EPUB互转工具
#[derive(Parser)]
#[command(name = "bookpack")]
#[command(about = "在章节树与EPUB 2之间打包和导入的Rust工具")]
#[command(version)]
struct Args {
    /// 详细输出模式
    #[arg(short, long, global = true, help = "输出调试日志")]
    verbose: bool,

    /// 配置文件路径
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH, help = "YAML配置文件路径")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 导入EPUB到书库
    Import {
        #[arg(help = "要导入的EPUB文件路径")]
        epub_file: PathBuf,

        #[arg(short, long, default_value = "library.yaml", help = "书库快照文件")]
        store: PathBuf,
    },
    /// 从书库导出EPUB
    Export {
        #[arg(short, long, default_value = "library.yaml", help = "书库快照文件")]
        store: PathBuf,

        #[arg(short, long, help = "要导出的书籍ID")]
        book_id: i64,

        #[arg(short, long, help = "输出的EPUB文件路径")]
        output: PathBuf,
    },
    /// 列出书库中的书籍
    List {
        #[arg(short, long, default_value = "library.yaml", help = "书库快照文件")]
        store: PathBuf,
    },
    /// 把目录打包为zip备份
    Backup {
        #[arg(help = "要备份的目录")]
        directory: PathBuf,

        #[arg(short, long, help = "输出的zip文件路径")]
        output: PathBuf,
    },
    /// 显示EPUB目录树
    Toc {
        #[arg(help = "EPUB文件路径")]
        epub_file: PathBuf,

        #[arg(long, value_enum, default_value = "tree", help = "目录树显示样式")]
        style: TreeStyle,

        #[arg(long, help = "最大显示深度")]
        max_depth: Option<u32>,

        #[arg(long, help = "不显示章节路径")]
        no_paths: bool,
    },
    /// 生成默认配置文件
    InitConfig,
}

/// 目录树显示样式
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TreeStyle {
    /// 树状符号
    Tree,
    /// 缩进列表
    Indented,
}

impl From<TreeStyle> for TocTreeStyle {
    fn from(style: TreeStyle) -> Self {
        match style {
            TreeStyle::Tree => TocTreeStyle::TreeSymbols,
            TreeStyle::Indented => TocTreeStyle::Indented,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    println!("📦 BookPack - 章节树与EPUB互转工具");

    match run(args).await {
        Ok(_) => println!("🎉 完成!"),
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "bookpack=debug" } else { "bookpack=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::InitConfig => {
            PackConfig::generate_default_config(&args.config)?;
            println!("📝 已生成配置文件: {}", args.config.display());
            Ok(())
        }
        Command::Import { epub_file, store } => {
            let config = PackConfig::load_or_default(&args.config)?;
            import_epub(&epub_file, &store, &config).await
        }
        Command::Export { store, book_id, output } => {
            let config = PackConfig::load_or_default(&args.config)?;
            export_epub(&store, book_id, &output, &config).await
        }
        Command::List { store } => list_books(&store).await,
        Command::Backup { directory, output } => {
            let config = PackConfig::load_or_default(&args.config)?;
            let level = config.backup_compression_level;
            let bytes = tokio::task::spawn_blocking(move || backup_directory(&directory, level))
                .await
                .map_err(std::io::Error::other)??;
            tokio::fs::write(&output, &bytes).await?;
            println!("💾 备份已写入: {} ({} 字节)", output.display(), bytes.len());
            Ok(())
        }
        Command::Toc {
            epub_file,
            style,
            max_depth,
            no_paths,
        } => display_toc(&epub_file, style.into(), max_depth, !no_paths).await,
    }
}

async fn import_epub(epub_file: &Path, store_path: &Path, config: &PackConfig) -> Result<()> {
    println!("📖 正在导入: {}", epub_file.display());

    let store = MemoryStore::load_or_new(store_path).await?;
    let source = EpubSource::open(epub_file).await?;
    let imported = import_book(&source, &store, &TracingProgress).await?;

    if let Some(cover) = source.cover_image()? {
        let path = resources::cover_path(&config.library_root, imported.book_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, cover).await?;
        println!("🖼️  封面已保存: {}", path.display());
    }

    store.save(store_path).await?;

    println!("\n📚 书籍信息:");
    println!("    ID: {}", imported.book_id);
    println!("    标题: {}", imported.metadata.title);
    println!("    作者: {}", imported.metadata.author);
    println!("    章节数: {}", store.chapter_count(imported.book_id));
    if let Some(first) = &imported.first_chapter {
        println!("    第一章: {} (ID: {})", first.label, first.id);
    }
    Ok(())
}

async fn export_epub(store_path: &Path, book_id: i64, output: &Path, config: &PackConfig) -> Result<()> {
    let store = MemoryStore::load(store_path).await?;
    let metadata = store.get_book(book_id).await?;
    println!("📖 正在导出: {} ({})", metadata.title, metadata.author);

    let bytes = export_book(&store, book_id, &metadata, config, &TracingProgress).await?;
    tokio::fs::write(output, &bytes).await?;
    println!("💾 EPUB已写入: {} ({} 字节)", output.display(), bytes.len());
    Ok(())
}

async fn list_books(store_path: &Path) -> Result<()> {
    let store = MemoryStore::load(store_path).await?;
    let books = store.books();

    println!("\n📚 书库中共有 {} 本书:", books.len());
    for (id, metadata) in books {
        println!(
            "    {}. {} - {} ({} 章)",
            id,
            metadata.title,
            metadata.author,
            store.chapter_count(id)
        );
    }
    Ok(())
}

async fn display_toc(epub_file: &Path, style: TocTreeStyle, max_depth: Option<u32>, show_paths: bool) -> Result<()> {
    let source = EpubSource::open(epub_file).await?;
    let metadata = source.metadata();

    let tree = TocTree::new(source.toc().to_vec())
        .with_title(Some(metadata.title.clone()))
        .with_style(style)
        .with_show_paths(show_paths)
        .with_max_depth(max_depth);

    println!("\n🌳 目录树:");
    print!("{}", tree);
    println!("\n📊 {}", tree.get_statistics());
    Ok(())
}
