use approx::assert_abs_diff_eq;
use candle_core::{DType, Device};
use matrix_util::traits::{ConvertMatOps, DenseOps, SampleOps};
use ndarray::{array, Array2, Axis};
use panda::normalize::normalize_network;
use panda::{
    align_inputs, AlignmentMode, CheckpointSink, EdgeList, EdgeTable, ExpressionTable, MemoryCheckpoint,
    MessagePassing, NotConverged, Panda, PandaConfig, PandaInput, PandaNetwork, Precision,
    StopReason,
};

fn names(prefix: &str, n: usize) -> Vec<Box<str>> {
    (0..n)
        .map(|i| format!("{}{:02}", prefix, i).into_boxed_str())
        .collect()
}

/// Random expression, a motif prior with ~40% density where every TF
/// has a target, and a single PPI edge
fn random_input(ngenes: usize, nsamples: usize, ntfs: usize) -> anyhow::Result<PandaInput> {
    let genes = names("g", ngenes);
    let tfs = names("TF", ntfs);

    let expression = ExpressionTable::new(
        genes.clone(),
        names("s", nsamples),
        Array2::<f64>::rnorm(ngenes, nsamples),
    )?;

    let u = Array2::<f64>::runif(ntfs, ngenes);
    let mut edges = vec![];
    for ((i, j), &x) in u.indexed_iter() {
        if x > 0.6 || i == j {
            edges.push((tfs[i].clone(), genes[j].clone(), 1.0));
        }
    }

    let ppi = vec![(tfs[0].clone(), tfs[1].clone(), 1.0)];

    Ok(PandaInput {
        expression: Some(expression),
        motif: Some(EdgeTable::new(edges)?),
        ppi: Some(EdgeTable::new(ppi)?),
    })
}

fn pearson(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let mut ret = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            let a = x.row(i).mapv(|v| v - x.row(i).mean().unwrap());
            let b = x.row(j).mapv(|v| v - x.row(j).mean().unwrap());
            ret[(i, j)] = a.dot(&b) / (a.dot(&a).sqrt() * b.dot(&b).sqrt());
        }
    }
    ret
}

#[test]
fn coexpression_without_priors() -> anyhow::Result<()> {
    let x = array![
        [1.0, 2.0, 4.0],
        [2.0, 1.0, 0.0],
        [0.5, 3.0, 1.0],
        [3.0, 3.5, 1.0]
    ];
    let input = PandaInput {
        expression: Some(ExpressionTable::new(
            names("g", 4),
            names("s", 3),
            x.clone(),
        )?),
        motif: None,
        ppi: None,
    };

    let panda = Panda::run(input, &PandaConfig::default(), None)?;
    assert_eq!(panda.steps, 0);

    let PandaNetwork::Dense(net) = &panda.network else {
        panic!("expected a dense network");
    };
    assert_eq!(net.rows, names("g", 4));
    assert_eq!(net.cols, names("g", 4));
    assert_abs_diff_eq!(net.data, pearson(&x), epsilon = 1e-12);
    for i in 0..4 {
        assert_abs_diff_eq!(net.data[(i, i)], 1.0, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn uniform_motif_without_expression() -> anyhow::Result<()> {
    let genes = names("g", 5);
    let tfs = names("TF", 3);
    let mut edges = vec![];
    for t in tfs.iter() {
        for g in genes.iter() {
            edges.push((t.clone(), g.clone(), 1.0));
        }
    }
    let input = PandaInput {
        expression: None,
        motif: Some(EdgeTable::new(edges)?),
        ppi: None,
    };

    let panda = Panda::run(input.clone(), &PandaConfig::default(), None)?;
    assert!(panda.steps >= 1);

    let net = panda.network_matrix()?;
    assert_eq!(net.dim(), (3, 5));
    assert!(net.iter().all(|x| x.is_finite()));
    let first = net[(0, 0)];
    assert!(net.iter().all(|&x| (x - first).abs() < 1e-12));

    // the refined TF-TF and gene-gene networks stay symmetric
    let data = align_inputs(input, &PandaConfig::default())?;
    assert_eq!(data.correlation, Array2::<f64>::eye(5));
    let motif = normalize_network(&data.motif.unwrap());
    let ppi = normalize_network(&data.ppi.unwrap());
    let corr = normalize_network(&data.correlation);
    let res = MessagePassing::default().run(motif, ppi, corr)?;
    assert_abs_diff_eq!(res.ppi, res.ppi.t(), epsilon = 1e-12);
    assert_abs_diff_eq!(res.correlation, res.correlation.t(), epsilon = 1e-12);
    assert!(res.ppi.iter().all(|x| x.is_finite()));
    Ok(())
}

#[test]
fn random_inputs_converge() -> anyhow::Result<()> {
    for _ in 0..3 {
        let config = PandaConfig {
            max_iter: 2_000,
            ..Default::default()
        };
        let panda = Panda::run(random_input(12, 6, 4)?, &config, None)?;

        assert!(panda.steps >= 1 && panda.steps < 2_000);
        assert_eq!(panda.hamming.len(), panda.steps);

        let last = *panda.hamming.last().unwrap();
        assert!(last <= 1e-3);
        assert!(panda.hamming[0] > last);

        // mostly non-increasing
        let increases = panda.hamming.windows(2).filter(|w| w[1] > w[0]).count();
        assert!(increases <= panda.steps / 2, "{:?}", panda.hamming);

        let net = panda.network_matrix()?;
        assert_eq!(net.dim(), (4, 12));
        assert!(net.iter().all(|x| x.is_finite()));
    }
    Ok(())
}

#[test]
fn iteration_cap() -> anyhow::Result<()> {
    let config = PandaConfig {
        max_iter: 1,
        ..Default::default()
    };
    let err = match Panda::run(random_input(10, 5, 3)?, &config, None) {
        Ok(_) => panic!("converged in one step"),
        Err(err) => err,
    };
    let nc = err.downcast_ref::<NotConverged>().expect("NotConverged");
    assert_eq!(nc.steps, 1);
    assert_eq!(nc.reason, StopReason::IterationCap);
    Ok(())
}

#[test]
fn ndarray_and_candle_agree() -> anyhow::Result<()> {
    let data = align_inputs(random_input(10, 8, 3)?, &PandaConfig::default())?;
    let motif = normalize_network(data.motif.as_ref().unwrap());
    let ppi = normalize_network(data.ppi.as_ref().unwrap());
    let corr = normalize_network(&data.correlation);

    let mp = MessagePassing {
        max_iter: 2_000,
        ..Default::default()
    };

    let on_host = mp.run(motif.clone(), ppi.clone(), corr.clone())?;

    let dev = Device::Cpu;
    let on_tensor = mp.run(
        motif.to_tensor(&dev, DType::F64)?,
        ppi.to_tensor(&dev, DType::F64)?,
        corr.to_tensor(&dev, DType::F64)?,
    )?;

    assert_eq!(on_host.steps, on_tensor.steps);
    assert_abs_diff_eq!(on_host.motif, on_tensor.motif.to_array()?, epsilon = 1e-8);
    assert_abs_diff_eq!(on_host.ppi, on_tensor.ppi.to_array()?, epsilon = 1e-8);
    Ok(())
}

#[test]
fn single_and_double_precision_agree() -> anyhow::Result<()> {
    let input = random_input(10, 8, 3)?;

    let double = Panda::run(input.clone(), &PandaConfig::default(), None)?;
    let single = Panda::run(
        input,
        &PandaConfig {
            precision: Precision::Single,
            ..Default::default()
        },
        None,
    )?;

    assert_abs_diff_eq!(
        double.network_matrix()?,
        single.network_matrix()?,
        epsilon = 1e-2
    );
    Ok(())
}

#[test]
fn edge_list_round_trip() -> anyhow::Result<()> {
    let input = random_input(8, 6, 3)?;
    let raw_motif = align_inputs(input.clone(), &PandaConfig::default())?
        .motif
        .unwrap();

    let dense = Panda::run(input.clone(), &PandaConfig::default(), None)?;
    let edges = Panda::run(
        input,
        &PandaConfig {
            save_memory: false,
            ..Default::default()
        },
        None,
    )?;

    let PandaNetwork::Edges(edge_list) = &edges.network else {
        panic!("expected an edge list");
    };
    let PandaNetwork::Dense(net) = &dense.network else {
        panic!("expected a dense network");
    };

    // TFs vary fastest within each gene
    let ntf = net.rows.len();
    assert_eq!(edge_list.len(), ntf * net.cols.len());
    for (k, (t, g)) in edge_list.tf.iter().zip(edge_list.gene.iter()).enumerate() {
        assert_eq!(t, &net.rows[k % ntf]);
        assert_eq!(g, &net.cols[k / ntf]);
        assert_abs_diff_eq!(edge_list.force[k], net.data[(k % ntf, k / ntf)], epsilon = 1e-12);
        assert_eq!(edge_list.motif.as_ref().unwrap()[k], raw_motif[(k % ntf, k / ntf)]);
    }

    let dir = tempfile::tempdir()?;
    let file = dir.path().join("edges.tsv.gz");
    let file = file.to_str().unwrap();
    edges.network.to_file(file)?;

    let back = EdgeList::from_file(file)?.to_dense()?;
    assert_eq!(back.rows, net.rows);
    assert_eq!(back.cols, net.cols);
    assert_eq!(back.data, net.data);
    Ok(())
}

#[test]
fn degrees_sum_force() -> anyhow::Result<()> {
    let panda = Panda::run(random_input(8, 6, 3)?, &PandaConfig::default(), None)?;
    let net = panda.network_matrix()?;

    let indeg = panda.network.in_degree()?;
    let colsum = net.sum_axis(Axis(0));
    assert_eq!(indeg.len(), panda.genes.len());
    for (j, g) in panda.genes.iter().enumerate() {
        let (_, d) = indeg.iter().find(|(x, _)| x == g).unwrap();
        assert_abs_diff_eq!(*d, colsum[j], epsilon = 1e-10);
    }

    let outdeg = panda.network.out_degree()?;
    let rowsum = net.sum_axis(Axis(1));
    for (i, t) in panda.tfs.iter().enumerate() {
        let (_, d) = outdeg.iter().find(|(x, _)| x == t).unwrap();
        assert_abs_diff_eq!(*d, rowsum[i], epsilon = 1e-10);
    }
    Ok(())
}

#[test]
fn checkpoints_are_saved() -> anyhow::Result<()> {
    let mut sink = MemoryCheckpoint::default();
    let panda = Panda::run(
        random_input(8, 6, 3)?,
        &PandaConfig::default(),
        Some(&mut sink as &mut dyn CheckpointSink),
    )?;

    assert_eq!(sink.get("expression").unwrap().dim(), (8, 6));
    assert_eq!(
        sink.get("motif.normalized").unwrap().dim(),
        (panda.tfs.len(), panda.genes.len())
    );
    assert_eq!(
        sink.get("ppi.normalized").unwrap().dim(),
        (panda.tfs.len(), panda.tfs.len())
    );
    assert!(panda.expression.is_none());
    Ok(())
}

#[test]
fn read_inputs_from_files() -> anyhow::Result<()> {
    use std::io::Write;

    let dir = tempfile::tempdir()?;
    let expr_file = dir.path().join("expr.tsv");
    let motif_file = dir.path().join("motif.txt");
    let ppi_file = dir.path().join("ppi.txt");

    let mut f = std::fs::File::create(&expr_file)?;
    writeln!(f, "gene\ts1\ts2\ts3\ts4")?;
    writeln!(f, "AR\t1.0\t2.0\t3.5\t0.1")?;
    writeln!(f, "BRCA1\t0.2\t0.4\t0.1\t0.9")?;
    writeln!(f, "MYC\t3.0\t1.0\t2.0\t2.5")?;

    let mut f = std::fs::File::create(&motif_file)?;
    writeln!(f, "TF1\tAR\t1")?;
    writeln!(f, "TF1\tMYC\t1")?;
    writeln!(f, "TF2\tBRCA1\t1")?;
    writeln!(f, "TF3\tMYC\t1")?;

    let mut f = std::fs::File::create(&ppi_file)?;
    writeln!(f, "TF1 TF2 1")?;
    writeln!(f, "TF2 TF3 0.5")?;

    let expression = ExpressionTable::from_file(expr_file.to_str().unwrap(), true)?;
    assert_eq!(expression.samples.len(), 4);
    assert_eq!(&*expression.genes[1], "BRCA1");

    let input = PandaInput {
        expression: Some(expression),
        motif: Some(EdgeTable::from_file(motif_file.to_str().unwrap())?),
        ppi: Some(EdgeTable::from_file(ppi_file.to_str().unwrap())?),
    };

    let panda = Panda::run(input, &PandaConfig::default(), None)?;
    assert_eq!(panda.tfs.len(), 3);
    assert_eq!(panda.genes.len(), 3);

    let out = dir.path().join("out/panda.parquet");
    panda.network.to_file(out.to_str().unwrap())?;
    let (fields, nrows) = matrix_util::parquet::peek_parquet(out.to_str().unwrap())?;
    assert_eq!(nrows, 3);
    assert_eq!(fields.len(), 4);
    Ok(())
}

#[test]
fn malformed_edges_are_rejected() -> anyhow::Result<()> {
    use std::io::Write;
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("motif.txt");
    let mut f = std::fs::File::create(&file)?;
    writeln!(f, "TF1\tAR\t1")?;
    writeln!(f, "TF1\tMYC")?;
    drop(f);
    assert!(EdgeTable::from_file(file.to_str().unwrap()).is_err());
    Ok(())
}

#[test]
fn disjoint_genes_leave_an_empty_network() -> anyhow::Result<()> {
    let expression = ExpressionTable::new(
        names("e", 3),
        names("s", 4),
        Array2::<f64>::rnorm(3, 4),
    )?;
    let motif = EdgeTable::new(vec![
        ("T1".into(), "m1".into(), 1.0),
        ("T2".into(), "m2".into(), 1.0),
    ])?;
    let input = PandaInput {
        expression: Some(expression),
        motif: Some(motif),
        ppi: None,
    };
    let config = PandaConfig {
        mode: AlignmentMode::Intersection,
        save_memory: false,
        ..Default::default()
    };

    let panda = Panda::run(input, &config, None)?;
    assert!(panda.genes.is_empty());
    assert_eq!(panda.tfs.len(), 2);
    assert_eq!(panda.steps, 0);
    assert!(panda.hamming.is_empty());

    let PandaNetwork::Edges(edges) = &panda.network else {
        panic!("expected an edge list");
    };
    assert!(edges.is_empty());
    assert!(panda.network.in_degree()?.is_empty());
    Ok(())
}
