//! LDA (Latent Dirichlet Allocation) Example
//!
//! This example demonstrates how to:
//! - Preprocess and tokenize movie plot summaries
//! - Encode them into a vocabulary and corpus
//! - Fit LDA with variational EM
//! - Inspect topics, per-document topic vectors and an unseen plot
//! - Rank the catalogue by topic similarity, as a recommender would

use anyhow::Result;
use variational_lda::models::Trainer;
use variational_lda::preprocessing::{CorpusBuilder, Tokenizer};
use variational_lda::utils::evaluation::{kl_divergence, ModelSummary};
use variational_lda::{Document, LdaConfig};

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Variational LDA Example ===\n");

    let documents = sample_plots();
    println!("Loaded {} documents\n", documents.len());

    // Step 1: Tokenize documents
    println!("Step 1: Tokenizing documents...");
    let tokenizer = Tokenizer::for_plot_summaries();
    let tokenized = tokenizer.tokenize_documents(&documents);

    if let Some(first_doc) = tokenized.first() {
        println!("  Sample tokens: {:?}", &first_doc[..first_doc.len().min(10)]);
    }

    // Step 2: Build vocabulary and corpus
    println!("\nStep 2: Building corpus...");
    let mut builder = CorpusBuilder::new().min_df(1).max_df_ratio(0.9).max_features(300);
    let (vocabulary, corpus) = builder.fit_transform(&tokenized);
    println!(
        "  {} documents, {} tokens, vocabulary size {}",
        corpus.len(),
        corpus.total_tokens(),
        vocabulary.len()
    );

    // Step 3: Configure and train
    let n_topics = 4;
    println!("\nStep 3: Training LDA with {} topics...", n_topics);

    let config = LdaConfig::new(n_topics)
        .max_em_iterations(100)
        .em_convergence_tolerance(1e-5)
        .max_inference_iterations(50)
        .seed(42);

    let trained = Trainer::new(config.clone())?.train(corpus, vocabulary)?;
    let model = &trained.model;
    println!(
        "  Stopped after {} iterations ({:?})",
        trained.iterations(),
        trained.stop_reason
    );

    // Step 4: Display topics
    println!("\n=== Discovered Topics ===\n");
    for topic in model.topics(8) {
        println!("{}", topic);
        println!();
    }

    // Step 5: Model evaluation
    println!("=== Model Evaluation ===\n");
    ModelSummary::from_model(model, 8).print();

    // Step 6: Document-topic analysis
    println!("\n=== Document-Topic Analysis ===\n");
    for (i, doc_text) in documents.iter().enumerate().take(10) {
        let preview: String = doc_text.chars().take(40).collect();
        let estimate = model.topic_estimate(i);
        let (topic, share) = estimate
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0), |best, (k, p)| if p > best.1 { (k, p) } else { best });

        println!(
            "  Doc {:2}: Topic {} ({:.2}%) - {}...",
            i + 1,
            topic,
            share * 100.0,
            preview
        );
    }

    // Step 7: Unseen document
    println!("\n=== Inferring New Document ===\n");
    let new_doc = "A rookie detective hunts a serial killer through the city while a crime family closes in";
    println!("New document: {}\n", new_doc);

    let words: Vec<usize> = tokenizer
        .tokenize(new_doc)
        .iter()
        .filter_map(|token| model.vocabulary().index_of(token))
        .collect();
    let posterior = model.infer(&Document::new(words), &config)?;
    let total = posterior.gamma.sum();

    println!("Topic distribution for new document ({:?}):", posterior.outcome);
    for (topic, g) in posterior.gamma.iter().enumerate() {
        println!("  Topic {}: {:.2}%", topic, g / total * 100.0);
    }

    // Closest plots by topic mix
    let query = &posterior.gamma / total;
    let mut ranked: Vec<(usize, f64)> = (0..model.n_documents())
        .map(|d| (d, kl_divergence(query.view(), model.topic_estimate(d).view())))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    println!("\nRecommended plots:");
    for &(d, divergence) in ranked.iter().take(3) {
        let preview: String = documents[d].chars().take(60).collect();
        println!("  KL {:.4} - {}...", divergence, preview);
    }

    // Step 8: Lower bound history
    println!("\n=== Training Convergence ===\n");
    for round in &trained.history {
        println!(
            "  Iteration {:3}: bound {:.4} (capped documents: {})",
            round.iteration, round.bound, round.capped_documents
        );
    }

    println!("\n=== LDA Example Complete ===");
    Ok(())
}

/// Plot summaries from four genres
fn sample_plots() -> Vec<String> {
    let texts = vec![
        // Crime
        "A detective investigates a string of murders and discovers the killer is a police officer",
        "Two hitmen working for a crime boss cross paths with a boxer who double crosses the mob",
        "An undercover cop infiltrates a gang of bank robbers and struggles with his loyalty",
        "A retired detective returns for one last murder case that haunts the city",
        "A crime family patriarch hands power to his son as rival gangs wage war",
        "A heist crew plans to rob a casino vault while a detective closes in",
        // Science fiction
        "Astronauts aboard a spaceship travel through a wormhole to find a new planet for humanity",
        "An android hunter tracks rogue replicants across a rain soaked future city",
        "A crew on a distant planet is stalked by an alien creature inside their spaceship",
        "A hacker learns that reality is a simulation run by machines and joins the resistance",
        "Scientists make contact with an alien signal and build a machine to travel to space",
        "A lone astronaut stranded on mars grows food and waits for rescue from earth",
        // Romance
        "Two strangers fall in love on a train across europe and spend one night in vienna",
        "A struggling actress and a jazz pianist fall in love while chasing their dreams",
        "A wealthy young woman falls in love with a poor artist aboard an ocean liner",
        "Childhood sweethearts separated by class and war reunite years later to rekindle love",
        "A bookshop owner falls in love with a famous actress who walks into his store",
        "A wedding planner falls for the groom of her most important wedding",
        // Animation and family
        "A young lion prince flees his kingdom after his father dies and returns to claim the throne",
        "Toys come to life when children leave the room and a cowboy doll fears being replaced",
        "A clownfish father crosses the ocean to find his son who was taken by a diver",
        "A young girl enters a spirit world and works in a bathhouse to save her parents",
        "A princess with ice powers runs away and her sister sets out to bring her home",
        "A rat who dreams of becoming a chef teams up with a kitchen boy in paris",
    ];

    texts.into_iter().map(String::from).collect()
}
