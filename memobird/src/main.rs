use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use memobird::utils::logger;
use memobird::{AppError, AuthState, ClientConfig, MemobirdClient, Paper, QrLoginOutcome};

/// 咕咕机云打印命令行
#[derive(Debug, Parser)]
#[command(name = "memobird", version, about)]
struct Cli {
    /// 会话快照文件 (默认读取 MEMOBIRD_SESSION_PATH 或 ./memobird.json)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    /// 日志目录,默认为系统数据目录下的 memobird/logs
    #[arg(long, global = true, env = "MEMOBIRD_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// 只输出控制台日志
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 登录 (默认扫码,Ctrl-C 取消)
    Login(LoginArgs),
    /// 显示登录状态
    Status,
    /// 列出绑定的设备
    Devices,
    /// 打印纸条
    Print(PrintArgs),
    /// 上传图片并输出地址
    Upload {
        path: PathBuf,
    },
    /// 注销
    Logout,
    /// 定期刷新会话,保持cookie有效
    Keepalive {
        /// 刷新间隔 (秒)
        #[arg(long, default_value_t = 600)]
        interval: u64,
    },
}

#[derive(Debug, Args)]
struct LoginArgs {
    /// 使用手机号和密码登录
    #[arg(long, requires_all = ["phone", "secret"])]
    password: bool,

    #[arg(long, env = "MEMOBIRD_PHONE")]
    phone: Option<String>,

    #[arg(long, env = "MEMOBIRD_SECRET", hide_env_values = true)]
    secret: Option<String>,
}

#[derive(Debug, Args)]
struct PrintArgs {
    /// 文本段落,可重复
    #[arg(long)]
    text: Vec<String>,

    /// 图片地址,可重复
    #[arg(long)]
    image: Vec<String>,

    /// 先上传再打印的本地图片,可重复
    #[arg(long)]
    upload: Vec<PathBuf>,

    /// 设备序号
    #[arg(long, default_value_t = 0)]
    device: usize,

    /// 纸条宽度 (像素)
    #[arg(long, default_value_t = memobird::models::paper::DEFAULT_PAPER_WIDTH)]
    width: u32,

    /// 只生成预览页面,不打印
    #[arg(long)]
    preview: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // 让 .env 中的值也能作为命令行参数的默认值
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let log_dir = if cli.no_log_file {
        None
    } else {
        cli.log_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("memobird").join("logs")))
    };
    let _guard = match logger::init(log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("日志系统初始化失败: {}", e);
            None
        }
    };
    match &dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded, using process environment"),
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("错误: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool, AppError> {
    let mut config = ClientConfig::from_process_env()?;
    if let Some(path) = cli.session {
        config = config.with_session_path(path);
    }
    let mut client = MemobirdClient::new(config)?;

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling");
            watcher.cancel();
        }
    });

    match cli.command {
        Command::Login(args) => {
            client
                .with_session(move |c| Box::pin(login(c, args, cancel)))
                .await
        }
        Command::Status => client.with_session(|c| Box::pin(status(c))).await,
        Command::Devices => client.with_session(|c| Box::pin(devices(c))).await,
        Command::Print(args) => client.with_session(move |c| Box::pin(print(c, args))).await,
        Command::Upload { path } => client.with_session(move |c| Box::pin(upload(c, path))).await,
        Command::Logout => client.with_session(|c| Box::pin(logout(c))).await,
        Command::Keepalive { interval } => {
            keepalive(&mut client, Duration::from_secs(interval), &cancel).await
        }
    }
}

async fn login(
    c: &mut MemobirdClient,
    args: LoginArgs,
    cancel: CancellationToken,
) -> Result<bool, AppError> {
    if c.is_logged_in() {
        println!("已登录: {} ({})", c.account().user_name, c.account().user_id);
        return Ok(true);
    }

    if args.password {
        let (Some(phone), Some(secret)) = (args.phone, args.secret) else {
            eprintln!("密码登录需要 --phone 和 --secret");
            return Ok(false);
        };
        let accepted = c.login(&phone, &secret).await?;
        if accepted {
            println!("登录成功: {}", c.account().user_name);
        } else {
            eprintln!("登录失败,请检查手机号和密码");
        }
        return Ok(accepted);
    }

    let outcome = c
        .login_with_qr(&cancel, |url| {
            println!("请用浏览器打开以下图片,并使用手机扫码登录:");
            println!("{}", url);
            println!();
        })
        .await?;

    match outcome {
        QrLoginOutcome::Authenticated => {
            println!("登录成功: {}", c.account().user_name);
            Ok(true)
        }
        QrLoginOutcome::Abandoned => {
            eprintln!("已取消扫码登录");
            Ok(false)
        }
    }
}

async fn status(c: &mut MemobirdClient) -> Result<bool, AppError> {
    match c.auth_state() {
        AuthState::Authenticated => {
            let account = c.account();
            println!("已登录");
            println!("  用户: {} ({})", account.user_name, account.user_id);
            println!("  设备: {} 台", account.devices.len());
        }
        AuthState::AwaitingQr | AuthState::Anonymous => println!("未登录"),
    }
    println!("  会话文件: {}", c.session_path().display());
    Ok(true)
}

async fn devices(c: &mut MemobirdClient) -> Result<bool, AppError> {
    if !c.is_logged_in() {
        eprintln!("未登录");
        return Ok(false);
    }
    for (index, device) in c.devices().iter().enumerate() {
        println!("[{}] {}  {}", index, device.name, device.guid);
    }
    Ok(true)
}

async fn print(c: &mut MemobirdClient, args: PrintArgs) -> Result<bool, AppError> {
    let mut paper = Paper::new(args.width);
    for text in args.text {
        paper.append_text(text);
    }
    for src in args.image {
        paper.append_image(src);
    }
    for path in &args.upload {
        match c.upload_image(path).await? {
            Some(url) => {
                paper.append_image(url);
            }
            None => eprintln!("图片上传失败,已跳过: {}", path.display()),
        }
    }

    if paper.is_empty() {
        eprintln!("纸条为空,请使用 --text / --image / --upload");
        return Ok(false);
    }

    if let Some(preview) = args.preview {
        tokio::fs::write(&preview, paper.preview_html()).await?;
        println!("预览已写入 {}", preview.display());
        return Ok(true);
    }

    if !c.is_logged_in() {
        eprintln!("未登录");
        return Ok(false);
    }

    let printed = c.print_paper(&paper, args.device).await?;
    if printed {
        println!("已发送到设备 [{}]", args.device);
    } else {
        eprintln!("打印失败 (设备序号无效或服务端拒绝)");
    }
    Ok(printed)
}

async fn upload(c: &mut MemobirdClient, path: PathBuf) -> Result<bool, AppError> {
    match c.upload_image(&path).await? {
        Some(url) => {
            println!("{}", url);
            Ok(true)
        }
        None => {
            eprintln!("上传失败: {}", path.display());
            Ok(false)
        }
    }
}

async fn logout(c: &mut MemobirdClient) -> Result<bool, AppError> {
    let done = c.logout().await?;
    if done {
        println!("已注销");
    } else {
        eprintln!("注销失败");
    }
    Ok(done)
}

/// 每个周期打开会话 (刷新账号信息) 后立即关闭,保存服务端轮换的cookie
async fn keepalive(
    client: &mut MemobirdClient,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<bool, AppError> {
    loop {
        let logged_in = client
            .with_session(|c| Box::pin(async move { Ok(c.is_logged_in()) }))
            .await?;
        tracing::info!(logged_in, "Session refreshed");
        if !logged_in {
            eprintln!("会话已失效,请重新登录");
            return Ok(false);
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(true),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
