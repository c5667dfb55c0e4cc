use std::fs;
use std::path::Path;
use clap::{Arg, ArgAction, ArgMatches, Command};
use walkdir::WalkDir;

use tweet_filter::builder::SnapshotBuilder;
use tweet_filter::{
    assemble, DashboardConfig, DashboardStats, FilterCategory, FilterState, MemoryStore,
    PaginationState, PostgrestRequest, RawFilterInput, RecordStore,
};
use utils_common::{Sentiment, TweetRecord};

// 主函数
fn main() {
    let matches = Command::new("推文快照工具")
        .version(env!("CARGO_PKG_VERSION"))
        .about("生成推文快照并离线执行仪表盘查询")
        .subcommand_required(true)
        .subcommand(
            Command::new("build")
                .about("从 JSON 导出文件生成压缩快照")
                .arg(Arg::new("input")
                    .short('i')
                    .long("input")
                    .value_name("INPUT")
                    .help("JSON 文件或包含 JSON 文件的目录")
                    .required(true))
                .arg(Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("OUTPUT_FILE")
                    .help("快照输出路径")
                    .required(true))
                .arg(Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("显示详细信息")
                    .action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("query")
                .about("在快照上执行筛选查询")
                .arg(Arg::new("snapshot")
                    .short('s')
                    .long("snapshot")
                    .value_name("SNAPSHOT_FILE")
                    .help("快照文件路径")
                    .required(true))
                .arg(Arg::new("term")
                    .short('t')
                    .long("term")
                    .value_name("TERM")
                    .help("筛选词，例如 10-100、>=50、2024-03-01 to 2024-03-03"))
                .arg(Arg::new("category")
                    .short('c')
                    .long("category")
                    .value_name("CATEGORY")
                    .help("筛选类别: all, username, date, likes, retweets, text")
                    .default_value("all"))
                .arg(Arg::new("sentiment")
                    .long("sentiment")
                    .value_name("LABEL")
                    .help("情感筛选: Positive, Neutral, Negative"))
                .arg(Arg::new("from")
                    .long("from")
                    .value_name("DATE")
                    .help("开始日期"))
                .arg(Arg::new("to")
                    .long("to")
                    .value_name("DATE")
                    .help("结束日期（包含当天）"))
                .arg(Arg::new("page")
                    .short('p')
                    .long("page")
                    .value_name("PAGE")
                    .help("页码")
                    .value_parser(clap::value_parser!(usize))
                    .default_value("1"))
                .arg(Arg::new("postgrest")
                    .long("postgrest")
                    .help("输出对应的 PostgREST 查询字符串")
                    .action(ArgAction::SetTrue)),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("build", args)) => run_build(args),
        Some(("query", args)) => run_query(args),
        _ => Err("未知的子命令".to_string()),
    };

    if let Err(e) = result {
        eprintln!("错误: {}", e);
        std::process::exit(1);
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str, String> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("缺少参数 --{}", name))
}

// 生成快照
fn run_build(args: &ArgMatches) -> Result<(), String> {
    let input = required(args, "input")?;
    let output = required(args, "output")?;
    let verbose = args.get_flag("verbose");

    let start_time = std::time::Instant::now();
    println!("开始读取推文数据: {}", input);

    let mut builder = SnapshotBuilder::new();
    let mut file_count = 0;
    for path in json_files(Path::new(input))? {
        let records = read_records(&path)?;
        if verbose {
            println!("读取 {}: {} 条推文", path, records.len());
        }
        for record in records {
            builder.add_record(record);
        }
        file_count += 1;
    }

    println!("读取完成。{} 个文件，{} 条推文。", file_count, builder.len());
    if builder.is_empty() {
        return Err("没有找到有效推文".to_string());
    }

    let size = builder.save_snapshot(output)?;
    let stats = builder.stats();
    println!("快照已写入 {}，大小: {} 字节", output, size);
    println!(
        "用户: {}，地区: {}，平均情感: {}",
        stats.unique_users, stats.districts_covered, stats.average_sentiment
    );
    println!(
        "情感分布: 正面 {} / 中性 {} / 负面 {} / 未标注 {}",
        stats.distribution.positive,
        stats.distribution.neutral,
        stats.distribution.negative,
        stats.distribution.unlabeled
    );
    println!("耗时: {:.2}秒", start_time.elapsed().as_secs_f32());
    Ok(())
}

// 收集输入路径下的所有 JSON 文件
fn json_files(input: &Path) -> Result<Vec<String>, String> {
    if input.is_file() {
        return Ok(vec![input.display().to_string()]);
    }
    if !input.is_dir() {
        return Err(format!("输入路径不存在: {}", input.display()));
    }

    let mut files: Vec<String> = WalkDir::new(input)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .map(|entry| entry.path().display().to_string())
        .collect();
    files.sort();
    Ok(files)
}

fn read_records(path: &str) -> Result<Vec<TweetRecord>, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("无法读取文件 {}: {}", path, e))?;
    serde_json::from_str(&content).map_err(|e| format!("解析 {} 失败: {}", path, e))
}

// 在快照上执行查询
fn run_query(args: &ArgMatches) -> Result<(), String> {
    let snapshot = required(args, "snapshot")?;
    let data = fs::read(snapshot).map_err(|e| format!("无法读取快照 {}: {}", snapshot, e))?;
    let store = MemoryStore::from_snapshot(&data).map_err(|e| e.to_string())?;

    let category: FilterCategory = required(args, "category")?.parse()?;
    let term = args.get_one::<String>("term").cloned().unwrap_or_default();

    let mut filters = FilterState {
        inputs: vec![RawFilterInput::new(term, category)],
        ..FilterState::default()
    };
    if let Some(label) = args.get_one::<String>("sentiment") {
        filters.sentiment = Some(
            Sentiment::from_label(label).ok_or_else(|| format!("未知的情感标签: {}", label))?,
        );
    }
    filters.date_range.from = args.get_one::<String>("from").cloned();
    filters.date_range.to = args.get_one::<String>("to").cloned();

    let config = DashboardConfig::default();
    let mut pagination = PaginationState::new(config.items_per_page);

    // 先取一次总数，这样翻页的上限是真实的页数
    let probe = store
        .execute(&assemble(&filters, pagination.window()))
        .map_err(|e| e.to_string())?;
    pagination.on_result_count(probe.total_count);
    let page = args.get_one::<usize>("page").copied().unwrap_or(1);
    for _ in 1..page {
        pagination.next();
    }

    let plan = assemble(&filters, pagination.window());
    if args.get_flag("postgrest") {
        println!("{}", PostgrestRequest::from_plan(&config, &plan).query_string());
    } else {
        let json = serde_json::to_string_pretty(&plan).map_err(|e| format!("序列化计划失败: {}", e))?;
        println!("{}", json);
    }

    let result = store.execute(&plan).map_err(|e| e.to_string())?;
    println!("{} | {}", filters.describe(result.records.len()), pagination.label());
    for record in &result.records {
        println!(
            "{}  @{:<20} {:>8}  ❤ {:<5} 🔄 {:<5} 💬 {:<5} {}",
            record.created_at.format("%b %d, %Y"),
            record.username,
            Sentiment::display(record.sentiment_score),
            record.like_count,
            record.retweet_count,
            record.reply_count,
            record.text.replace('\n', " ")
        );
    }

    if result.records.is_empty() {
        println!("No tweets found");
    }

    let stats = DashboardStats::from_records(store.records());
    println!("快照共 {} 条推文，平均情感 {}", stats.total_tweets, stats.average_sentiment);
    Ok(())
}
