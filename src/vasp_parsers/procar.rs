use std::path::Path;

use anyhow::Context;
use memchr::memmem;
use ndarray::{
    s,
    Array5,
};
use nom::{
    bytes::complete::tag,
    character::complete::{
        digit1,
        line_ending,
        multispace0,
        not_line_ending,
        space0,
        space1,
    },
    combinator::{
        map_res,
        opt,
    },
    multi::count,
    number::complete::double,
    sequence::{
        preceded,
        terminated,
        tuple,
    },
    IResult,
};

use crate::{
    error::BandcharError,
    types::{
        Cube,
        Matrix,
        Result,
        Vector,
    },
    vasp_parsers::read_txt_maybe_compressed,
};


/// K-point list from the PROCAR header block.
#[derive(Clone, Debug)]
pub struct Kpoints {
    pub nkpoints:   u32,
    pub kpointlist: Matrix<f64>,        // [ikpoint, 3]
    pub weights:    Vector<f64>,
}


/// Orbital-projected band table of a collinear (LORBIT=11) PROCAR.
///
/// `projected` is indexed `[ispin, ikpoint, iband, iion, iorbit]`. The
/// trailing ion row (`iion == nions`) holds the over-ions totals printed
/// by VASP, and the last entry of `nlm` is the over-orbitals `tot` column.
#[derive(Clone, Debug)]
pub struct ProjectedDOS {
    pub nions:       u32,
    pub nspin:       u32,
    pub nkpoints:    u32,
    pub nbands:      u32,
    pub nlm:         Vec<String>,
    pub eigvals:     Cube<f64>,         // [ispin, ikpoint, iband]
    pub occupations: Cube<f64>,
    pub projected:   Array5<f64>,
}


#[derive(Clone, Debug)]
pub struct Procar {
    pub kpoints: Kpoints,
    pub pdos:    ProjectedDOS,
}


struct BandBlock {
    energy:     f64,
    occupation: f64,
    weights:    Matrix<f64>,            // [iion(+tot), iorbit]
}


struct SpinBlock {
    nkpoints: usize,
    nbands:   usize,
    nions:    usize,
    nlm:      Vec<String>,
    kpoints:  Vec<([f64; 3], f64)>,
    bands:    Vec<BandBlock>,           // k-point major
}


fn uint(i: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse)(i)
}

// `# of k-points:    1         # of bands:  192         # of ions:   40`
fn counts_line(i: &str) -> IResult<&str, (usize, usize, usize)> {
    tuple((
        preceded(tuple((multispace0, tag("# of k-points:"), space0)), uint),
        preceded(tuple((space0, tag("# of bands:"), space0)), uint),
        preceded(tuple((space0, tag("# of ions:"), space0)), uint),
    ))(i)
}

// ` k-point     1 :    0.00000000 0.00000000 0.00000000     weight = 1.00000000`
//
// The three coordinates may run together when a component is negative,
// `preceded(space0, double)` accepts both spellings.
fn kpoint_line(i: &str) -> IResult<&str, ([f64; 3], f64)> {
    let (i, _)  = tuple((multispace0, tag("k-point"), space1))(i)?;
    let (i, _)  = uint(i)?;
    let (i, _)  = tuple((space0, tag(":")))(i)?;
    let (i, kx) = preceded(space0, double)(i)?;
    let (i, ky) = preceded(space0, double)(i)?;
    let (i, kz) = preceded(space0, double)(i)?;
    let (i, _)  = tuple((space0, tag("weight ="), space0))(i)?;
    let (i, w)  = double(i)?;
    Ok((i, ([kx, ky, kz], w)))
}

// `band   1 # energy   -6.56754478 # occ.  1.00000000`
fn band_line(i: &str) -> IResult<&str, (usize, f64, f64)> {
    let (i, _)      = tuple((multispace0, tag("band"), space1))(i)?;
    let (i, index)  = uint(i)?;
    let (i, _)      = tuple((space1, tag("# energy"), space0))(i)?;
    let (i, energy) = double(i)?;
    let (i, _)      = tuple((space1, tag("# occ."), space0))(i)?;
    let (i, occ)    = double(i)?;
    Ok((i, (index, energy, occ)))
}

// `ion      s     py     pz     px    dxy    dyz    dz2    dxz    dx2    tot`
fn orbital_names_line(i: &str) -> IResult<&str, Vec<String>> {
    let (i, _)    = tuple((multispace0, tag("ion"), space1))(i)?;
    let (i, line) = terminated(not_line_ending, line_ending)(i)?;
    Ok((i, line.split_whitespace().map(str::to_string).collect()))
}

// `  1  0.438  0.000  0.000  0.000  0.000  0.000  0.000  0.000  0.000  0.438`
//
// `space0` keeps the values on one physical row: a short row fails here
// instead of borrowing numbers from the next line.
fn weight_row(i: &str, ncol: usize) -> IResult<&str, (usize, Vec<f64>)> {
    let (i, _)     = multispace0(i)?;
    let (i, index) = uint(i)?;
    let (i, vals)  = count(preceded(space0, double), ncol)(i)?;
    Ok((i, (index, vals)))
}

// The `tot` row is absent when the cell holds a single ion.
fn total_row(i: &str, ncol: usize) -> IResult<&str, Option<Vec<f64>>> {
    opt(preceded(
        tuple((multispace0, tag("tot"), space1)),
        count(preceded(space0, double), ncol),
    ))(i)
}

fn parsed<'a, T>(res: IResult<&'a str, T>, what: &str) -> Result<(&'a str, T)> {
    res.map_err(|e| {
        let near: String = match &e {
            nom::Err::Error(err) | nom::Err::Failure(err) =>
                err.input.chars().take(48).collect(),
            nom::Err::Incomplete(_) => String::from("<end of input>"),
        };
        anyhow::Error::from(
            BandcharError::Parse(format!("expected {} near {:?}", what, near)))
    })
}


fn parse_spin_block(block: &str) -> Result<SpinBlock> {
    let (i, (nkpoints, nbands, nions)) =
        parsed(counts_line(block), "the k-point/band/ion counts header")?;

    if nkpoints == 0 {
        return Err(BandcharError::InsufficientData(
            "the file holds no k-points".to_string()).into());
    }
    if nbands == 0 {
        return Err(BandcharError::InsufficientData(
            "the file holds no bands".to_string()).into());
    }
    if nions == 0 {
        return Err(BandcharError::Parse("the file holds no ions".to_string()).into());
    }

    let mut kpoints = Vec::with_capacity(nkpoints);
    let mut bands   = Vec::with_capacity(nkpoints * nbands);
    let mut nlm     = Vec::<String>::new();
    let mut rest    = i;

    for ik in 0 .. nkpoints {
        let (i, kvw) = parsed(kpoint_line(rest), "a k-point line")?;
        rest = i;
        kpoints.push(kvw);

        for ib in 0 .. nbands {
            let (i, (index, energy, occupation)) =
                parsed(band_line(rest), "a band header line")?;
            rest = i;
            if index != ib + 1 {
                return Err(BandcharError::Parse(format!(
                    "band index {} where band {} was expected (k-point {})",
                    index, ib + 1, ik + 1)).into());
            }

            let (i, names) = parsed(orbital_names_line(rest), "the orbital name row")?;
            rest = i;
            if names.last().map(String::as_str) != Some("tot") {
                return Err(BandcharError::Parse(
                    "the orbital name row does not end with a `tot` column".to_string()).into());
            }
            if nlm.is_empty() {
                nlm = names;
            } else if nlm != names {
                return Err(BandcharError::Parse(
                    "orbital name rows differ between band tables".to_string()).into());
            }

            let ncol = nlm.len();
            let mut weights = Matrix::<f64>::zeros((nions + 1, ncol));
            for iion in 0 .. nions {
                let (i, (index, vals)) =
                    parsed(weight_row(rest, ncol), "an ion projection row")?;
                rest = i;
                if index != iion + 1 {
                    return Err(BandcharError::Parse(format!(
                        "ion index {} where ion {} was expected (band {}, k-point {})",
                        index, iion + 1, ib + 1, ik + 1)).into());
                }
                for (icol, v) in vals.into_iter().enumerate() {
                    weights[[iion, icol]] = v;
                }
            }

            let (i, totals) = parsed(total_row(rest, ncol), "the `tot` projection row")?;
            rest = i;
            match totals {
                Some(vals) => {
                    for (icol, v) in vals.into_iter().enumerate() {
                        weights[[nions, icol]] = v;
                    }
                },
                None if nions == 1 => {
                    let single = weights.row(0).to_owned();
                    weights.row_mut(1).assign(&single);
                },
                None => {
                    return Err(BandcharError::Parse(format!(
                        "missing `tot` projection row (band {}, k-point {})",
                        ib + 1, ik + 1)).into());
                },
            }

            bands.push(BandBlock { energy, occupation, weights });
        }
    }

    Ok(SpinBlock { nkpoints, nbands, nions, nlm, kpoints, bands })
}


impl Procar {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let context = read_txt_maybe_compressed(path.as_ref())?;
        Self::from_context(&context)
            .with_context(|| format!("Parsing PROCAR file {:?} failed", path.as_ref()))
    }

    fn from_context(context: &str) -> Result<Self> {
        let offsets = memmem::find_iter(context.as_bytes(), b"# of k-points:")
            .collect::<Vec<usize>>();

        if offsets.is_empty() {
            return Err(BandcharError::Parse(
                "no `# of k-points:` header, this does not look like a PROCAR".to_string()).into());
        }
        if offsets.len() > 2 {
            return Err(BandcharError::Parse(format!(
                "{} spin blocks found where at most 2 are expected (phase and \
                 noncollinear PROCARs are not supported)", offsets.len())).into());
        }

        let nspin = offsets.len();
        let mut blocks = Vec::with_capacity(nspin);
        for (iblock, &beg) in offsets.iter().enumerate() {
            let end = offsets.get(iblock + 1).copied().unwrap_or(context.len());
            let block = parse_spin_block(&context[beg .. end])
                .with_context(|| format!("in spin block {}", iblock + 1))?;
            blocks.push(block);
        }

        let first = &blocks[0];
        for block in &blocks[1 ..] {
            if (block.nkpoints, block.nbands, block.nions)
                != (first.nkpoints, first.nbands, first.nions) {
                return Err(BandcharError::Parse(format!(
                    "spin blocks disagree on the table shape: \
                     {} k-points, {} bands, {} ions vs {} k-points, {} bands, {} ions",
                    first.nkpoints, first.nbands, first.nions,
                    block.nkpoints, block.nbands, block.nions)).into());
            }
            if block.nlm != first.nlm {
                return Err(BandcharError::Parse(
                    "spin blocks disagree on the orbital names".to_string()).into());
            }
        }

        let nkpoints = first.nkpoints;
        let nbands   = first.nbands;
        let nions    = first.nions;
        let nlm      = first.nlm.clone();
        let norbits  = nlm.len();

        let mut kpointlist = Matrix::<f64>::zeros((nkpoints, 3));
        let mut weights    = Vector::<f64>::zeros(nkpoints);
        for (ik, (coord, w)) in first.kpoints.iter().enumerate() {
            for (j, c) in coord.iter().enumerate() {
                kpointlist[[ik, j]] = *c;
            }
            weights[ik] = *w;
        }

        let mut eigvals     = Cube::<f64>::zeros((nspin, nkpoints, nbands));
        let mut occupations = Cube::<f64>::zeros((nspin, nkpoints, nbands));
        let mut projected   = Array5::<f64>::zeros((nspin, nkpoints, nbands, nions + 1, norbits));

        for (ispin, block) in blocks.iter().enumerate() {
            for ik in 0 .. nkpoints {
                for ib in 0 .. nbands {
                    let band = &block.bands[ik * nbands + ib];
                    eigvals[[ispin, ik, ib]]     = band.energy;
                    occupations[[ispin, ik, ib]] = band.occupation;
                    projected.slice_mut(s![ispin, ik, ib, .., ..]).assign(&band.weights);
                }
            }
        }

        Ok(Self {
            kpoints: Kpoints {
                nkpoints: nkpoints as u32,
                kpointlist,
                weights,
            },
            pdos: ProjectedDOS {
                nions:    nions as u32,
                nspin:    nspin as u32,
                nkpoints: nkpoints as u32,
                nbands:   nbands as u32,
                nlm,
                eigvals,
                occupations,
                projected,
            },
        })
    }
}
