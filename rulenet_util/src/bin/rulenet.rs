use ::{
    failure::Error,
    itertools::Itertools,
    rulenet::{prelude::*, FactSet},
    std::path::PathBuf,
    structopt::StructOpt,
    tracing_subscriber::EnvFilter,
};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rulenet",
    about = "Load a grammar and sentences into a forward-chaining knowledge base and query it."
)]
struct RulenetOpt {
    /// PEG grammar defining the fact syntax.
    #[structopt(short, long, parse(from_os_str))]
    grammar: PathBuf,

    /// TOML configuration file.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Files of sentences to tell, in order.
    #[structopt(parse(from_os_str))]
    inputs: Vec<PathBuf>,

    /// Patterns to query after loading.
    #[structopt(short, long = "query")]
    queries: Vec<String>,

    /// Goals to report missing conditions for.
    #[structopt(short = "G", long = "goal")]
    goals: Vec<String>,

    /// Print every known fact after loading.
    #[structopt(short, long)]
    dump: bool,
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("RULENET_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let opts = RulenetOpt::from_args();
    if opts.inputs.is_empty() && opts.queries.is_empty() && opts.goals.is_empty() {
        failure::bail!("Nothing to do: give input files, queries or goals.");
    }

    let config = rulenet_util::load_config(opts.config.as_ref())?;
    let mut kb = rulenet_util::load_knowledge_base(&opts.grammar, config, &opts.inputs)?;

    if opts.dump {
        for fact in kb.facts().iter() {
            println!("{}", fact);
        }
    }

    for query in &opts.queries {
        match kb.query(query)? {
            Answer::No => println!("{}: no", query),
            Answer::Yes => println!("{}: yes", query),
            Answer::Bindings(answers) => {
                for answer in answers {
                    println!(
                        "{}: {}",
                        query,
                        answer
                            .iter()
                            .format_with(", ", |(k, v), f| f(&format_args!("{} = {}", k, v)))
                    );
                }
            }
        }
    }

    for goal in &opts.goals {
        let reports = kb.goal(goal)?;
        if reports.is_empty() {
            println!("{}: nothing to report", goal);
        }
        for report in reports {
            println!("{}: needs {}", goal, report.iter().join(", "));
        }
    }

    Ok(())
}
